//! Per-connection session engine.
//!
//! One session owns one accepted connection and walks the protocol
//! state machine: read a frame, decrypt, decode, dispatch, encode,
//! encrypt, write, repeat. Error handling follows the protocol's
//! taxonomy:
//!
//! - transport failures (truncated prefix, peer closed mid-frame,
//!   oversized length, broken writes) end the session, after a
//!   best-effort error frame;
//! - decrypt and decode failures are answered in-band and the session
//!   keeps serving;
//! - domain failures never reach this layer — the dispatcher folds
//!   them into error responses.

use std::sync::Arc;

use kithnet_crypto::cipher::FrameCipher;
use kithnet_protocol::framing::{read_frame, write_frame};
use kithnet_protocol::message::{decode_request, Response};
use kithnet_types::{KithnetError, Result};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::dispatcher::Dispatcher;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The protocol state machine owning one client connection.
///
/// Generic over the stream so tests can drive it through an in-memory
/// duplex; production uses a `TcpStream`.
pub struct Session<S> {
    stream: S,
    cipher: Arc<FrameCipher>,
    dispatcher: Dispatcher,
    peer: String,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a session over an accepted stream.
    ///
    /// `peer` is a display label for logging (the remote address).
    pub fn new(stream: S, cipher: Arc<FrameCipher>, dispatcher: Dispatcher, peer: String) -> Self {
        Self {
            stream,
            cipher,
            dispatcher,
            peer,
        }
    }

    /// Serves the connection until the peer disconnects or a
    /// transport error occurs.
    ///
    /// Requests are processed strictly in arrival order: the next
    /// frame is not read until the previous response has been written
    /// in full.
    pub async fn run(mut self) {
        tracing::debug!(peer = %self.peer, "session started");

        loop {
            let blob = match read_frame(&mut self.stream).await {
                Ok(Some(blob)) => blob,
                Ok(None) => {
                    tracing::debug!(peer = %self.peer, "client disconnected");
                    break;
                }
                Err(e) => {
                    // Fatal: answer if the socket still accepts writes,
                    // then tear down. Resynchronizing on a corrupted
                    // frame boundary is not possible.
                    tracing::warn!(peer = %self.peer, %e, "framing failure, closing session");
                    let _ = self.send_response(&Response::from_error(&e)).await;
                    break;
                }
            };

            let plaintext = match self.cipher.decrypt(&blob) {
                Ok(plaintext) => plaintext,
                Err(e) => {
                    tracing::debug!(peer = %self.peer, %e, "undecryptable frame");
                    if self.answer_error(&e).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let request = match decode_request(&plaintext) {
                Ok(request) => request,
                Err(e) => {
                    tracing::debug!(peer = %self.peer, %e, "undecodable request");
                    if self.answer_error(&e).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let response = self.dispatcher.dispatch(request).await;
            if let Err(e) = self.send_response(&response).await {
                tracing::warn!(peer = %self.peer, %e, "failed to write response, closing session");
                break;
            }
        }

        tracing::debug!(peer = %self.peer, "session closed");
    }

    /// Sends an in-band error response for a recoverable failure.
    async fn answer_error(&mut self, err: &KithnetError) -> Result<()> {
        self.send_response(&Response::from_error(err)).await
    }

    /// Encodes, encrypts, frames, and writes one response in full.
    async fn send_response(&mut self, response: &Response) -> Result<()> {
        let json = serde_json::to_vec(response).map_err(|e| KithnetError::ProtocolError {
            reason: format!("response serialization failed: {e}"),
        })?;
        let blob = self.cipher.encrypt(&json)?;
        write_frame(&mut self.stream, &blob).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
