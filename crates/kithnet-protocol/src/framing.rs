//! Length-prefixed frame codec.
//!
//! One frame = `u32` big-endian ciphertext length, then exactly that
//! many bytes. Reads accumulate until the frame is complete, so
//! partial socket reads never surface to callers; a peer that closes
//! mid-frame produces a transport error, while a peer that closes
//! cleanly between frames produces `Ok(None)`.

use kithnet_types::{KithnetError, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a declared frame length.
///
/// A length prefix above this is a protocol violation, not an
/// allocation request — the frame is rejected before any body byte is
/// read.
pub const MAX_FRAME_LEN: usize = 8 * 1024 * 1024;

/// Reads one frame.
///
/// Returns `Ok(None)` iff the peer closed the connection before
/// sending any byte of the length prefix (a clean disconnect).
///
/// # Errors
///
/// - [`KithnetError::TransportError`] if the length prefix is
///   truncated, the body is cut short by EOF, or the read itself
///   fails.
/// - [`KithnetError::ProtocolError`] if the declared length exceeds
///   [`MAX_FRAME_LEN`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];

    // First read distinguishes clean EOF from a truncated prefix.
    let n = reader
        .read(&mut len_buf)
        .await
        .map_err(|e| KithnetError::TransportError {
            reason: format!("failed to read length prefix: {e}"),
        })?;
    if n == 0 {
        return Ok(None);
    }
    if n < len_buf.len() {
        reader
            .read_exact(&mut len_buf[n..])
            .await
            .map_err(|e| KithnetError::TransportError {
                reason: format!("length prefix truncated: {e}"),
            })?;
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(KithnetError::ProtocolError {
            reason: format!("oversized frame: {len} bytes exceeds the {MAX_FRAME_LEN} byte limit"),
        });
    }

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => KithnetError::TransportError {
                reason: format!("peer closed mid-frame (expected {len} bytes)"),
            },
            _ => KithnetError::TransportError {
                reason: format!("failed to read frame body: {e}"),
            },
        })?;

    Ok(Some(body))
}

/// Writes one frame: length prefix, then the body, flushed.
///
/// `write_all` semantics — the call returns only once every byte has
/// been accepted by the socket.
///
/// # Errors
///
/// - [`KithnetError::ProtocolError`] if `body` exceeds
///   [`MAX_FRAME_LEN`].
/// - [`KithnetError::TransportError`] if any write or the flush fails.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if body.len() > MAX_FRAME_LEN {
        return Err(KithnetError::ProtocolError {
            reason: format!(
                "refusing to send oversized frame: {} bytes exceeds the {MAX_FRAME_LEN} byte limit",
                body.len()
            ),
        });
    }

    let len = body.len() as u32;
    writer
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| KithnetError::TransportError {
            reason: format!("failed to write length prefix: {e}"),
        })?;
    writer
        .write_all(body)
        .await
        .map_err(|e| KithnetError::TransportError {
            reason: format!("failed to write frame body: {e}"),
        })?;
    writer
        .flush()
        .await
        .map_err(|e| KithnetError::TransportError {
            reason: format!("failed to flush frame: {e}"),
        })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
