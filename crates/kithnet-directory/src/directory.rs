//! Directory lifecycle and state machine.
//!
//! The [`Directory`] is the public entry point for the Kithnet state
//! owner. It rebuilds the graph from the account store, then exposes a
//! channel-based API for external consumers (sessions, tests).
//!
//! # State machine
//!
//! ```text
//! Initializing ──start()──▶ Running ──shutdown()──▶ ShuttingDown ──▶ (dropped)
//! ```
//!
//! Double-start and shutdown-from-initializing are rejected with
//! `KithnetError::ConfigError`.

use kithnet_store::AccountStore;
use kithnet_types::{KithnetError, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::command::DirectoryCommand;
use crate::event_loop::{self, DirectoryRuntime};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Bounded command channel capacity.
///
/// Commands from sessions. Small buffer — callers await backpressure
/// if the event loop is overloaded.
const COMMAND_CHANNEL_SIZE: usize = 256;

/// Default store flush interval in seconds.
const FLUSH_TICK_SECS: u64 = 300;

// ---------------------------------------------------------------------------
// DirectoryState
// ---------------------------------------------------------------------------

/// Lifecycle state of the directory.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DirectoryState {
    /// Components created, event loop not started.
    Initializing,
    /// Event loop is active.
    Running,
    /// Graceful shutdown in progress.
    ShuttingDown,
}

impl std::fmt::Display for DirectoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Running => write!(f, "running"),
            Self::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// The Kithnet directory — owns the graph and the account store, and
/// drives the event loop.
///
/// After construction via [`Directory::new`], call
/// [`Directory::start`] to spawn the event loop. Interact through
/// cloned senders from [`Directory::command_sender`]; shut down via
/// [`DirectoryCommand::Shutdown`] or [`Directory::shutdown`].
pub struct Directory {
    /// Current lifecycle state.
    state: DirectoryState,

    /// Components to be moved into the event loop. `None` after
    /// `start()` has been called.
    runtime: Option<DirectoryRuntime>,

    /// Sender for commands to the event loop.
    command_tx: mpsc::Sender<DirectoryCommand>,

    /// Signals the event loop to shut down.
    shutdown_tx: watch::Sender<bool>,
}

impl Directory {
    /// Creates a directory over an opened account store.
    ///
    /// The in-memory graph is rebuilt from the persisted accounts:
    /// one node per account, one edge per mirrored friend link.
    ///
    /// # Errors
    ///
    /// - `KithnetError::StorageError` if the accounts cannot be read.
    pub fn new(store: AccountStore) -> Result<Self> {
        let graph = event_loop::rebuild_graph(&store)?;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runtime = DirectoryRuntime {
            graph,
            store,
            command_rx,
            shutdown_rx,
            flush_tick_secs: FLUSH_TICK_SECS,
        };

        Ok(Self {
            state: DirectoryState::Initializing,
            runtime: Some(runtime),
            command_tx,
            shutdown_tx,
        })
    }

    /// Starts the event loop in a new tokio task.
    ///
    /// Transitions `Initializing → Running`. Returns the `JoinHandle`
    /// that resolves when the event loop exits (after shutdown).
    ///
    /// # Errors
    ///
    /// - `KithnetError::ConfigError` if the directory is not in
    ///   `Initializing` state (prevents double-start).
    pub fn start(&mut self) -> Result<JoinHandle<()>> {
        if self.state != DirectoryState::Initializing {
            return Err(KithnetError::ConfigError {
                reason: format!(
                    "cannot start directory in state '{}'; expected 'initializing'",
                    self.state,
                ),
            });
        }

        let runtime = self.runtime.take().ok_or_else(|| KithnetError::ConfigError {
            reason: "runtime already consumed (double start?)".into(),
        })?;

        let handle = tokio::spawn(async move {
            event_loop::run_event_loop(runtime).await;
        });

        self.state = DirectoryState::Running;
        Ok(handle)
    }

    /// Initiates graceful shutdown.
    ///
    /// Signals the event loop to flush the store and exit. Await the
    /// `JoinHandle` returned by [`start`](Self::start) to wait for
    /// completion. Idempotent once running.
    ///
    /// # Errors
    ///
    /// - `KithnetError::ConfigError` if the directory was never
    ///   started (nothing to shut down).
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state == DirectoryState::Initializing {
            return Err(KithnetError::ConfigError {
                reason: "cannot shutdown a directory that has not been started".into(),
            });
        }
        if self.state == DirectoryState::ShuttingDown {
            return Ok(());
        }

        self.state = DirectoryState::ShuttingDown;
        let _ = self.shutdown_tx.send(true);
        Ok(())
    }

    /// Returns a sender for submitting commands to the directory.
    ///
    /// The sender is cloneable — every session holds a copy.
    pub fn command_sender(&self) -> mpsc::Sender<DirectoryCommand> {
        self.command_tx.clone()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> DirectoryState {
        self.state
    }
}
