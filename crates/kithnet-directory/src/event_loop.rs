//! The directory event loop and its request handlers.
//!
//! [`run_event_loop`] is spawned as a tokio task by
//! [`Directory::start`](crate::directory::Directory::start). It uses
//! `tokio::select!` to multiplex:
//!
//! 1. **Commands** — one per iteration, from sessions and tests.
//! 2. **Flush tick** — periodic store flush (durability point).
//! 3. **Shutdown signal** — graceful exit via `watch` channel.
//!
//! Every handler that mutates state touches the graph and the account
//! store inside the same iteration, so no other command can observe a
//! half-applied friendship change.

use std::time::Duration;

use kithnet_crypto::password::{hash_password, verify_password};
use kithnet_graph::SocialGraph;
use kithnet_protocol::message::{FriendSummary, SearchEntry, SuggestionEntry, UserProfile};
use kithnet_store::AccountStore;
use kithnet_types::{Account, KithnetError, Result};
use tokio::sync::{mpsc, watch};

use crate::command::DirectoryCommand;

// ---------------------------------------------------------------------------
// DirectoryRuntime (internal)
// ---------------------------------------------------------------------------

/// Owned runtime state moved into the event loop task.
///
/// Not exported — only [`Directory`](crate::directory::Directory) and
/// [`run_event_loop`] access this struct.
pub(crate) struct DirectoryRuntime {
    pub graph: SocialGraph,
    pub store: AccountStore,
    pub command_rx: mpsc::Receiver<DirectoryCommand>,
    pub shutdown_rx: watch::Receiver<bool>,
    pub flush_tick_secs: u64,
}

// ---------------------------------------------------------------------------
// Event loop entry point
// ---------------------------------------------------------------------------

/// Runs the directory event loop until shutdown is signalled.
pub(crate) async fn run_event_loop(mut rt: DirectoryRuntime) {
    tracing::info!(
        users = rt.graph.node_count(),
        "directory event loop started"
    );

    let mut flush_tick = tokio::time::interval(Duration::from_secs(rt.flush_tick_secs));
    // The first tick fires immediately; consume it so the tick branch
    // only represents elapsed intervals.
    flush_tick.tick().await;

    loop {
        tokio::select! {
            // ---------------------------------------------------------------
            // 1. Process one command from a session.
            // ---------------------------------------------------------------
            Some(cmd) = rt.command_rx.recv() => {
                let should_shutdown = handle_command(cmd, &mut rt);
                if should_shutdown {
                    tracing::info!("shutdown command received -- exiting event loop");
                    break;
                }
            }

            // ---------------------------------------------------------------
            // 2. Periodic store flush (durability point).
            // ---------------------------------------------------------------
            _ = flush_tick.tick() => {
                if let Err(e) = rt.store.flush() {
                    tracing::warn!(%e, "periodic store flush failed");
                } else {
                    tracing::debug!("store flushed");
                }
            }

            // ---------------------------------------------------------------
            // 3. Shutdown signal via watch channel.
            // ---------------------------------------------------------------
            changed = rt.shutdown_rx.changed() => {
                match changed {
                    Ok(()) if !*rt.shutdown_rx.borrow() => {}
                    _ => {
                        tracing::info!("shutdown signal received -- exiting event loop");
                        break;
                    }
                }
            }
        }
    }

    shutdown_sequence(&rt.store);
    tracing::info!("directory event loop exited");
}

/// Performs graceful shutdown: flush the store, log final state.
fn shutdown_sequence(store: &AccountStore) {
    if let Err(e) = store.flush() {
        tracing::error!(%e, "failed to flush store during shutdown");
    }
    tracing::info!(accounts = store.len(), "shutdown complete");
}

// ---------------------------------------------------------------------------
// Command handler
// ---------------------------------------------------------------------------

/// Processes a single directory command.
///
/// Returns `true` if the event loop should exit (shutdown command).
///
/// Intentionally **not** async: every handler is synchronous, so a
/// graph+store mutation pair can never be interleaved with another
/// command at an await point.
fn handle_command(cmd: DirectoryCommand, rt: &mut DirectoryRuntime) -> bool {
    match cmd {
        DirectoryCommand::Login { username, password, reply } => {
            let _ = reply.send(handle_login(rt, &username, &password));
            false
        }

        DirectoryCommand::Register { username, password, name, photo, reply } => {
            let _ = reply.send(handle_register(rt, &username, &password, &name, photo));
            false
        }

        DirectoryCommand::UpdateProfile { username, name, photo, reply } => {
            let _ = reply.send(handle_update_profile(rt, &username, name, photo));
            false
        }

        DirectoryCommand::ChangePassword { username, old_password, new_password, reply } => {
            let _ = reply.send(handle_change_password(rt, &username, &old_password, &new_password));
            false
        }

        DirectoryCommand::AddFriend { user1, user2, reply } => {
            let _ = reply.send(handle_add_friend(rt, &user1, &user2));
            false
        }

        DirectoryCommand::RemoveFriend { user1, user2, reply } => {
            let _ = reply.send(handle_remove_friend(rt, &user1, &user2));
            false
        }

        DirectoryCommand::GetFriends { username, reply } => {
            let _ = reply.send(handle_get_friends(rt, &username));
            false
        }

        DirectoryCommand::FindPath { start, end, reply } => {
            let _ = reply.send(handle_find_path(rt, &start, &end));
            false
        }

        DirectoryCommand::GetSuggestions { username, reply } => {
            let _ = reply.send(handle_get_suggestions(rt, &username));
            false
        }

        DirectoryCommand::SearchUsers { query, current_user, reply } => {
            let _ = reply.send(handle_search_users(rt, &query, &current_user));
            false
        }

        DirectoryCommand::GetStats { reply } => {
            let _ = reply.send(rt.graph.degree_stats());
            false
        }

        DirectoryCommand::Shutdown => true,
    }
}

// ---------------------------------------------------------------------------
// Account handlers
// ---------------------------------------------------------------------------

fn handle_login(rt: &DirectoryRuntime, username: &str, password: &str) -> Result<UserProfile> {
    // Unknown user and wrong password collapse into one error so the
    // response cannot be used to probe for registered usernames.
    let account = rt
        .store
        .get(username)?
        .ok_or(KithnetError::InvalidCredentials)?;
    if !verify_password(password, &account.password_hash) {
        tracing::debug!(%username, "login rejected");
        return Err(KithnetError::InvalidCredentials);
    }
    tracing::info!(%username, "login succeeded");
    Ok(UserProfile::from(&account))
}

fn handle_register(
    rt: &mut DirectoryRuntime,
    username: &str,
    password: &str,
    name: &str,
    photo: Option<String>,
) -> Result<()> {
    if username.is_empty() {
        return Err(KithnetError::InvalidRequest {
            reason: "username must not be empty".into(),
        });
    }

    let password_hash = hash_password(password)?;
    if !rt.store.put_new(username, &password_hash, name, photo)? {
        return Err(KithnetError::UserExists {
            username: username.to_string(),
        });
    }
    rt.graph.add_user(username);
    tracing::info!(%username, "user registered");
    Ok(())
}

fn handle_update_profile(
    rt: &mut DirectoryRuntime,
    username: &str,
    name: Option<String>,
    photo: Option<String>,
) -> Result<UserProfile> {
    let mutated = rt.store.mutate(username, |account| {
        if let Some(name) = name {
            account.name = name;
        }
        if let Some(photo) = photo {
            account.photo = Some(photo);
        }
    })?;
    if !mutated {
        return Err(KithnetError::UnknownUser {
            username: username.to_string(),
        });
    }

    let account = rt.store.get(username)?.ok_or_else(|| KithnetError::UnknownUser {
        username: username.to_string(),
    })?;
    tracing::debug!(%username, "profile updated");
    Ok(UserProfile::from(&account))
}

fn handle_change_password(
    rt: &mut DirectoryRuntime,
    username: &str,
    old_password: &str,
    new_password: &str,
) -> Result<()> {
    let account = rt.store.get(username)?.ok_or_else(|| KithnetError::UnknownUser {
        username: username.to_string(),
    })?;
    if !verify_password(old_password, &account.password_hash) {
        return Err(KithnetError::InvalidCredentials);
    }

    let new_hash = hash_password(new_password)?;
    rt.store.mutate(username, |account| {
        account.password_hash = new_hash;
    })?;
    tracing::info!(%username, "password changed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Friendship handlers
// ---------------------------------------------------------------------------

fn handle_add_friend(rt: &mut DirectoryRuntime, user1: &str, user2: &str) -> Result<bool> {
    // Graph first: it validates endpoints and detects the idempotent
    // case, so the store is only touched when the edge is new.
    if !rt.graph.add_friendship(user1, user2)? {
        tracing::debug!(%user1, %user2, "already friends");
        return Ok(false);
    }

    if let Err(e) = rt.store.add_friend_link(user1, user2) {
        // Keep graph and store in lockstep: undo the edge.
        let _ = rt.graph.remove_friendship(user1, user2);
        tracing::warn!(%e, %user1, %user2, "friend link rolled back");
        return Err(e);
    }
    tracing::info!(%user1, %user2, "friendship added");
    Ok(true)
}

fn handle_remove_friend(rt: &mut DirectoryRuntime, user1: &str, user2: &str) -> Result<()> {
    if !rt.graph.remove_friendship(user1, user2)? {
        // Non-existent edge: report failure, mutate nothing.
        return Err(KithnetError::InvalidRequest {
            reason: format!("no friendship between {user1} and {user2}"),
        });
    }

    if let Err(e) = rt.store.remove_friend_link(user1, user2) {
        let _ = rt.graph.add_friendship(user1, user2);
        tracing::warn!(%e, %user1, %user2, "friend unlink rolled back");
        return Err(e);
    }
    tracing::info!(%user1, %user2, "friendship removed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Query handlers
// ---------------------------------------------------------------------------

fn handle_get_friends(rt: &DirectoryRuntime, username: &str) -> Result<Vec<FriendSummary>> {
    let account = rt.store.get(username)?.ok_or_else(|| KithnetError::UnknownUser {
        username: username.to_string(),
    })?;

    let mut friends = Vec::with_capacity(account.friends.len());
    for friend_name in &account.friends {
        match rt.store.get(friend_name)? {
            Some(friend) => friends.push(FriendSummary {
                name: friend.name,
                username: friend.username,
                photo: friend.photo,
                friend_count: friend.friends.len(),
            }),
            None => {
                tracing::warn!(%friend_name, "friend link points at missing account");
            }
        }
    }
    Ok(friends)
}

fn handle_find_path(rt: &DirectoryRuntime, start: &str, end: &str) -> Result<Vec<String>> {
    rt.graph
        .shortest_path(start, end)
        .ok_or_else(|| KithnetError::NoPath {
            start: start.to_string(),
            end: end.to_string(),
        })
}

fn handle_get_suggestions(
    rt: &DirectoryRuntime,
    username: &str,
) -> Result<Vec<SuggestionEntry>> {
    if rt.store.get(username)?.is_none() {
        return Err(KithnetError::UnknownUser {
            username: username.to_string(),
        });
    }

    let mut suggestions = Vec::new();
    for candidate in rt.graph.suggestions(username) {
        match rt.store.get(&candidate.username)? {
            Some(account) => suggestions.push(SuggestionEntry {
                name: account.name,
                username: account.username,
                photo: account.photo,
                friend_count: account.friends.len(),
                common_friends: candidate.common_friends,
            }),
            None => {
                tracing::warn!(
                    username = %candidate.username,
                    "suggestion candidate missing from store"
                );
            }
        }
    }
    Ok(suggestions)
}

fn handle_search_users(
    rt: &DirectoryRuntime,
    query: &str,
    current_user: &str,
) -> Result<Vec<SearchEntry>> {
    let query = query.to_lowercase();
    let searcher_friends = rt
        .store
        .get(current_user)?
        .map(|account| account.friends)
        .unwrap_or_default();

    let mut results: Vec<SearchEntry> = rt
        .store
        .list_accounts()?
        .into_iter()
        .filter(|account| account.username != current_user)
        .filter(|account| {
            account.username.to_lowercase().contains(&query)
                || account.name.to_lowercase().contains(&query)
        })
        .map(|account| SearchEntry {
            is_friend: searcher_friends.contains(&account.username),
            friend_count: account.friends.len(),
            name: account.name,
            username: account.username,
            photo: account.photo,
        })
        .collect();
    results.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(results)
}

// ---------------------------------------------------------------------------
// Startup graph rebuild
// ---------------------------------------------------------------------------

/// Rebuilds the in-memory graph from the persisted accounts.
///
/// Nodes first, then edges, so every friend link finds both
/// endpoints. A link whose far side is missing from the store is
/// logged and skipped rather than aborting startup.
pub(crate) fn rebuild_graph(store: &AccountStore) -> Result<SocialGraph> {
    let accounts: Vec<Account> = store.list_accounts()?;

    let mut graph = SocialGraph::new();
    for account in &accounts {
        graph.add_user(&account.username);
    }

    let mut edges = 0usize;
    for account in &accounts {
        for friend in &account.friends {
            match graph.add_friendship(&account.username, friend) {
                Ok(true) => edges += 1,
                Ok(false) => {} // mirrored link, already added
                Err(e) => {
                    tracing::warn!(%e, user = %account.username, %friend,
                        "skipping unresolvable friend link");
                }
            }
        }
    }

    tracing::info!(users = accounts.len(), edges, "graph rebuilt from store");
    Ok(graph)
}
