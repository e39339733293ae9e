//! Commands for session → directory communication.
//!
//! [`DirectoryCommand`] is the bounded-channel message type that the
//! request dispatcher (and tests) use to drive the directory. Each
//! command that produces a result carries a
//! `tokio::sync::oneshot::Sender` for the reply.
//!
//! All commands are processed sequentially inside the event loop,
//! eliminating race conditions between concurrent sessions.

use kithnet_graph::GraphStats;
use kithnet_protocol::message::{FriendSummary, SearchEntry, SuggestionEntry, UserProfile};
use tokio::sync::oneshot;

/// Convenience alias to avoid shadowing `std::result::Result`.
type KResult<T> = std::result::Result<T, kithnet_types::KithnetError>;

// ---------------------------------------------------------------------------
// DirectoryCommand
// ---------------------------------------------------------------------------

/// Commands accepted by the directory event loop.
///
/// Sent through a bounded `mpsc::Sender<DirectoryCommand>` channel.
/// The event loop processes one command per iteration, ensuring
/// serial access to the graph and the account store.
pub enum DirectoryCommand {
    /// Authenticate a user. Replies with the profile on success.
    Login {
        username: String,
        password: String,
        reply: oneshot::Sender<KResult<UserProfile>>,
    },

    /// Create an account and its isolated graph node in one step.
    Register {
        username: String,
        password: String,
        name: String,
        photo: Option<String>,
        reply: oneshot::Sender<KResult<()>>,
    },

    /// Update display name and/or photo. Absent fields are untouched.
    /// Replies with the updated profile.
    UpdateProfile {
        username: String,
        name: Option<String>,
        photo: Option<String>,
        reply: oneshot::Sender<KResult<UserProfile>>,
    },

    /// Replace the password hash after verifying the old password.
    ChangePassword {
        username: String,
        old_password: String,
        new_password: String,
        reply: oneshot::Sender<KResult<()>>,
    },

    /// Add a friendship edge, mirrored into both accounts.
    /// Replies with `true` if the edge was newly created, `false` if
    /// the pair was already friends (idempotent no-op).
    AddFriend {
        user1: String,
        user2: String,
        reply: oneshot::Sender<KResult<bool>>,
    },

    /// Remove a friendship edge, mirrored into both accounts.
    /// Removing a non-existent edge replies with an error and leaves
    /// both data structures untouched.
    RemoveFriend {
        user1: String,
        user2: String,
        reply: oneshot::Sender<KResult<()>>,
    },

    /// List a user's friends with per-friend profile summaries.
    GetFriends {
        username: String,
        reply: oneshot::Sender<KResult<Vec<FriendSummary>>>,
    },

    /// Shortest friendship path between two users, endpoints included.
    FindPath {
        start: String,
        end: String,
        reply: oneshot::Sender<KResult<Vec<String>>>,
    },

    /// Ranked common-neighbor friend suggestions.
    GetSuggestions {
        username: String,
        reply: oneshot::Sender<KResult<Vec<SuggestionEntry>>>,
    },

    /// Substring search over usernames and display names.
    SearchUsers {
        query: String,
        current_user: String,
        reply: oneshot::Sender<KResult<Vec<SearchEntry>>>,
    },

    /// Graph-wide degree statistics. Infallible.
    GetStats {
        reply: oneshot::Sender<GraphStats>,
    },

    /// Initiate graceful shutdown.
    ///
    /// The event loop flushes the store and exits. No reply channel —
    /// await the `JoinHandle` returned by `Directory::start` to
    /// confirm completion.
    Shutdown,
}

// Manual Debug because oneshot::Sender does not implement Debug.
impl std::fmt::Debug for DirectoryCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Register { username, name, .. } => f
                .debug_struct("Register")
                .field("username", username)
                .field("name", name)
                .finish_non_exhaustive(),
            Self::UpdateProfile { username, .. } => f
                .debug_struct("UpdateProfile")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::ChangePassword { username, .. } => f
                .debug_struct("ChangePassword")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::AddFriend { user1, user2, .. } => f
                .debug_struct("AddFriend")
                .field("user1", user1)
                .field("user2", user2)
                .finish_non_exhaustive(),
            Self::RemoveFriend { user1, user2, .. } => f
                .debug_struct("RemoveFriend")
                .field("user1", user1)
                .field("user2", user2)
                .finish_non_exhaustive(),
            Self::GetFriends { username, .. } => f
                .debug_struct("GetFriends")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::FindPath { start, end, .. } => f
                .debug_struct("FindPath")
                .field("start", start)
                .field("end", end)
                .finish_non_exhaustive(),
            Self::GetSuggestions { username, .. } => f
                .debug_struct("GetSuggestions")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::SearchUsers { query, current_user, .. } => f
                .debug_struct("SearchUsers")
                .field("query", query)
                .field("current_user", current_user)
                .finish_non_exhaustive(),
            Self::GetStats { .. } => f.write_str("GetStats"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}
