//! In-memory social graph engine for the Kithnet service.
//!
//! A simple, undirected, unweighted graph whose nodes are usernames
//! and whose edges are friendships. The graph is a derived view of the
//! account store; the directory actor keeps both in lockstep.
//!
//! # Modules
//!
//! - [`graph`] — the [`SocialGraph`](graph::SocialGraph) structure and
//!   its queries: shortest path, degree statistics, friend suggestions

pub mod graph;

pub use graph::{DegreeEntry, GraphStats, SocialGraph, SuggestionCandidate, MAX_SUGGESTIONS};
