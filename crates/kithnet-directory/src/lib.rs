//! The Kithnet directory: a single actor owning all mutable state.
//!
//! Every session talks to the directory through a bounded command
//! channel; the event loop processes one command per iteration, so
//! each graph-plus-store mutation pair is atomic with respect to all
//! other commands. No mutex, no ambient globals — serialization by
//! construction.
//!
//! # Modules
//!
//! - [`command`] — [`DirectoryCommand`](command::DirectoryCommand),
//!   the channel message type with oneshot reply senders
//! - [`directory`] — the [`Directory`](directory::Directory) lifecycle
//! - [`event_loop`] — the command-processing loop and handlers

pub mod command;
pub mod directory;
pub mod event_loop;

pub use command::DirectoryCommand;
pub use directory::{Directory, DirectoryState};
