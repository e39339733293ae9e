//! Request/response wire types.
//!
//! Requests and responses are closed tagged unions decoded exactly
//! once at the protocol boundary; handlers never touch raw JSON. The
//! `action` tag uses snake_case variant names, so the wire strings
//! (`"login"`, `"add_friend"`, ...) fall out of the enum directly.

use kithnet_graph::GraphStats;
use kithnet_types::{Account, KithnetError, Result, Timestamp};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A client request, tagged on the `action` field.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Authenticate with username and password.
    Login { username: String, password: String },
    /// Create a new account with an isolated graph node.
    Register {
        username: String,
        password: String,
        name: String,
        #[serde(default)]
        photo: Option<String>,
    },
    /// Update display name and/or photo; absent fields are untouched.
    UpdateProfile {
        username: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        photo: Option<String>,
    },
    /// Replace the password after verifying the old one.
    ChangePassword {
        username: String,
        old_password: String,
        new_password: String,
    },
    /// Add the friendship edge `(user1, user2)`.
    AddFriend { user1: String, user2: String },
    /// Remove the friendship edge `(user1, user2)`.
    RemoveFriend { user1: String, user2: String },
    /// List a user's friends with per-friend profile summaries.
    GetFriends { username: String },
    /// Shortest friendship path between two users.
    FindPath { start: String, end: String },
    /// Common-neighbor friend suggestions for a user.
    GetSuggestions { username: String },
    /// Case-insensitive substring search over usernames and names.
    SearchUser { query: String, current_user: String },
    /// Graph-wide degree statistics.
    GetStats,
}

/// Wire strings of every recognized action, in declaration order.
const KNOWN_ACTIONS: &[&str] = &[
    "login",
    "register",
    "update_profile",
    "change_password",
    "add_friend",
    "remove_friend",
    "get_friends",
    "find_path",
    "get_suggestions",
    "search_user",
    "get_stats",
];

/// Decodes a plaintext payload into a [`Request`].
///
/// Two failure classes, both recoverable for the session:
///
/// - not JSON at all → `ProtocolError("invalid JSON payload")`;
/// - valid JSON with a missing or unrecognized `action` →
///   `ProtocolError("invalid action")`;
/// - recognized action with missing/ill-typed fields →
///   `ProtocolError` naming the action and the serde defect.
pub fn decode_request(payload: &[u8]) -> Result<Request> {
    let value: serde_json::Value =
        serde_json::from_slice(payload).map_err(|_| KithnetError::ProtocolError {
            reason: "invalid JSON payload".into(),
        })?;

    let action = value
        .get("action")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    let recognized = action
        .as_deref()
        .is_some_and(|a| KNOWN_ACTIONS.contains(&a));
    if !recognized {
        return Err(KithnetError::ProtocolError {
            reason: "invalid action".into(),
        });
    }

    serde_json::from_value(value).map_err(|e| KithnetError::ProtocolError {
        reason: format!(
            "malformed '{}' request: {e}",
            action.unwrap_or_default()
        ),
    })
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A server response, tagged on the `status` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// The request succeeded; the body carries the per-action payload.
    Success(ResponseBody),
    /// The request failed; `message` says why. Never a connection
    /// fault — errors travel in-band.
    Error { message: String },
}

impl Response {
    /// Builds an error response from a message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Builds an error response from any [`KithnetError`].
    pub fn from_error(err: &KithnetError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}

/// Per-action success payloads.
///
/// Untagged: each variant has a distinct required field name, so the
/// shape alone identifies it. `Message` must stay last — it is the
/// only variant whose field also appears on plain acknowledgements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// `login`, `update_profile`: the account profile (hash excluded).
    UserData { user_data: UserProfile },
    /// `get_friends`: per-friend summaries.
    Friends { friends: Vec<FriendSummary> },
    /// `find_path`: node sequence from start to end inclusive.
    Path { path: Vec<String> },
    /// `get_suggestions`: ranked candidates.
    Suggestions { suggestions: Vec<SuggestionEntry> },
    /// `search_user`: matching users.
    Users { users: Vec<SearchEntry> },
    /// `get_stats`: degree statistics.
    Stats { stats: GraphStats },
    /// `register`, `change_password`, `add_friend`, `remove_friend`:
    /// a plain acknowledgement.
    Message { message: String },
}

// ---------------------------------------------------------------------------
// Success payload types
// ---------------------------------------------------------------------------

/// An account as exposed on the wire: everything except the password
/// hash.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub name: String,
    pub photo: Option<String>,
    pub friends: Vec<String>,
    pub created_at: Timestamp,
}

impl From<&Account> for UserProfile {
    fn from(account: &Account) -> Self {
        Self {
            username: account.username.clone(),
            name: account.name.clone(),
            photo: account.photo.clone(),
            friends: account.friends.iter().cloned().collect(),
            created_at: account.created_at.clone(),
        }
    }
}

/// One entry of a `get_friends` response.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FriendSummary {
    pub name: String,
    pub username: String,
    pub photo: Option<String>,
    pub friend_count: usize,
}

/// One entry of a `get_suggestions` response.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SuggestionEntry {
    pub name: String,
    pub username: String,
    pub photo: Option<String>,
    pub friend_count: usize,
    /// Number of friends shared with the requesting user.
    pub common_friends: usize,
}

/// One entry of a `search_user` response.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub name: String,
    pub username: String,
    pub photo: Option<String>,
    pub friend_count: usize,
    /// Whether the match is already a friend of the searching user.
    pub is_friend: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
