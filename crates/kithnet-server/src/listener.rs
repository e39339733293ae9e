//! TCP listener: accept loop and session spawning.
//!
//! The accept loop is the only sequential bottleneck in the server.
//! It does no per-connection work beyond taking a connection permit
//! and spawning the session task, so one slow client can never stall
//! another's accept.

use std::net::SocketAddr;
use std::sync::Arc;

use kithnet_crypto::cipher::FrameCipher;
use kithnet_directory::DirectoryCommand;
use kithnet_types::{KithnetError, Result};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinHandle;

use crate::dispatcher::Dispatcher;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default maximum concurrent connections.
const MAX_CONNECTIONS: usize = 100;

/// Listener configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections; further accepts are refused
    /// until a session ends.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], 8080).into(),
            max_connections: MAX_CONNECTIONS,
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// The TCP front end.
pub struct Server;

impl Server {
    /// Binds the listener and spawns the accept loop as a tokio task.
    ///
    /// Returns the bound address (useful when binding port 0) and the
    /// accept loop's `JoinHandle`. The loop exits when the shutdown
    /// watch fires; in-flight sessions run to their natural end.
    ///
    /// # Errors
    ///
    /// Returns [`KithnetError::ConfigError`] if the bind fails.
    pub async fn start(
        config: ServerConfig,
        cipher: Arc<FrameCipher>,
        command_tx: mpsc::Sender<DirectoryCommand>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(SocketAddr, JoinHandle<()>)> {
        let listener =
            TcpListener::bind(config.bind_addr)
                .await
                .map_err(|e| KithnetError::ConfigError {
                    reason: format!("failed to bind {}: {e}", config.bind_addr),
                })?;
        let local_addr = listener.local_addr().map_err(|e| KithnetError::ConfigError {
            reason: format!("failed to read bound address: {e}"),
        })?;

        tracing::info!(%local_addr, max_connections = config.max_connections, "server listening");

        let handle = tokio::spawn(accept_loop(listener, config, cipher, command_tx, shutdown_rx));
        Ok((local_addr, handle))
    }
}

async fn accept_loop(
    listener: TcpListener,
    config: ServerConfig,
    cipher: Arc<FrameCipher>,
    command_tx: mpsc::Sender<DirectoryCommand>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let permits = Arc::new(Semaphore::new(config.max_connections));

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                match changed {
                    Ok(()) if !*shutdown_rx.borrow() => {}
                    _ => {
                        tracing::info!("shutdown signal received -- accept loop exiting");
                        break;
                    }
                }
            }

            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(%e, "accept failed");
                        continue;
                    }
                };

                let permit = match permits.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::warn!(%peer, "connection limit reached, refusing client");
                        drop(stream);
                        continue;
                    }
                };

                tracing::info!(%peer, "client connected");
                let session = Session::new(
                    stream,
                    cipher.clone(),
                    Dispatcher::new(command_tx.clone()),
                    peer.to_string(),
                );
                tokio::spawn(async move {
                    session.run().await;
                    drop(permit);
                });
            }
        }
    }
}
