//! Durable account store for the Kithnet social-graph service.
//!
//! Backed by sled. Account records are bincode-encoded, one record per
//! username. The store is the source of truth for the friendship
//! relation; the in-memory graph is rebuilt from it at startup.
//!
//! # Modules
//!
//! - [`accounts`] — the [`AccountStore`](accounts::AccountStore)

pub mod accounts;

pub use accounts::AccountStore;
