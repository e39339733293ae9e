//! Core shared types for the Kithnet social-graph service.
//!
//! This crate defines all fundamental types used across the workspace.
//! No other crate should define shared types — everything lives here.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// UTC timestamp in ISO 8601 format.
///
/// All timestamps in Kithnet use UTC so account records order
/// identically regardless of the server's timezone.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a `Timestamp` representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A registered account: profile data, credentials, and friend set.
///
/// The `username` is the unique key; it never changes after
/// registration. `friends` is kept as a sorted set so that every
/// serialization of an account lists friendships in a stable order.
///
/// The account store is the source of truth for the `friends`
/// relation; the in-memory social graph mirrors it and the two are
/// mutated in lockstep by the directory actor.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account key.
    pub username: String,
    /// Display name shown to other users.
    pub name: String,
    /// Opaque client-encoded profile photo, if one was uploaded.
    pub photo: Option<String>,
    /// Password hash in PHC string format. Never leaves the server.
    pub password_hash: String,
    /// Usernames of this account's friends.
    pub friends: BTreeSet<String>,
    /// Registration time.
    pub created_at: Timestamp,
}

impl Account {
    /// Creates a fresh account with no friends.
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        photo: Option<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            name: name.into(),
            photo,
            password_hash: password_hash.into(),
            friends: BTreeSet::new(),
            created_at: Timestamp::now(),
        }
    }

    /// Number of friends (the account's degree in the social graph).
    pub fn friend_count(&self) -> usize {
        self.friends.len()
    }
}

// ---------------------------------------------------------------------------
// KithnetError
// ---------------------------------------------------------------------------

/// Central error type for the Kithnet system.
///
/// All crates in the workspace convert their internal errors into
/// variants of this enum, ensuring a unified error handling surface.
/// Domain variants (`UnknownUser`, `UserExists`, `InvalidCredentials`,
/// `NoPath`, `InvalidRequest`) always become in-band error responses;
/// only `TransportError` may terminate a session.
#[derive(Debug, Error)]
pub enum KithnetError {
    /// A request is structurally valid but semantically rejected.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Human-readable description of the rejection.
        reason: String,
    },

    /// The named user is not registered.
    #[error("unknown user: {username}")]
    UnknownUser {
        /// The username that failed to resolve.
        username: String,
    },

    /// Registration attempted with a username that is already taken.
    #[error("user already exists: {username}")]
    UserExists {
        /// The contested username.
        username: String,
    },

    /// Login or password change with credentials that do not verify.
    ///
    /// Deliberately does not distinguish unknown-user from
    /// wrong-password, so the error cannot be used to probe for
    /// registered usernames.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No path exists between two users in the friendship graph.
    #[error("no path between {start} and {end}")]
    NoPath {
        /// Path search origin.
        start: String,
        /// Path search target.
        end: String,
    },

    /// A cryptographic operation failed (encryption, decryption, hashing).
    #[error("crypto error: {reason}")]
    CryptoError {
        /// Human-readable description of the cryptographic failure.
        reason: String,
    },

    /// A storage operation failed.
    #[error("storage error: {reason}")]
    StorageError {
        /// Human-readable description of the storage failure.
        reason: String,
    },

    /// A transport-level failure: truncated frame, broken socket.
    /// The only error class that tears down a session.
    #[error("transport error: {reason}")]
    TransportError {
        /// Human-readable description of the transport failure.
        reason: String,
    },

    /// A protocol-level failure: undecodable payload, unknown action,
    /// missing required fields.
    #[error("protocol error: {reason}")]
    ProtocolError {
        /// Human-readable description of the protocol failure.
        reason: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },
}

impl KithnetError {
    /// Returns `true` for the transport error class — the only class
    /// that closes a session instead of producing an error response.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportError { .. })
    }
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`KithnetError`].
pub type Result<T> = std::result::Result<T, KithnetError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_starts_with_no_friends() {
        let account = Account::new("alice", "Alice", None, "$argon2id$stub");
        assert_eq!(account.friend_count(), 0);
        assert!(account.friends.is_empty());
    }

    #[test]
    fn account_serde_json_roundtrip() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut account = Account::new("bob", "Bob B", Some("img".into()), "$hash");
        account.friends.insert("alice".into());
        let json = serde_json::to_string(&account)?;
        let parsed: Account = serde_json::from_str(&json)?;
        assert_eq!(account, parsed);
        Ok(())
    }

    #[test]
    fn friends_serialize_in_sorted_order() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut account = Account::new("carol", "Carol", None, "$hash");
        account.friends.insert("zed".into());
        account.friends.insert("alice".into());
        account.friends.insert("mike".into());
        let json = serde_json::to_string(&account)?;
        let alice = json.find("alice").unwrap_or(usize::MAX);
        let mike = json.find("mike").unwrap_or(0);
        let zed = json.find("zed").unwrap_or(0);
        assert!(alice < mike && mike < zed);
        Ok(())
    }

    #[test]
    fn timestamp_display_iso8601() {
        let ts = Timestamp::now();
        assert!(ts.to_string().contains('T'), "ISO 8601 must contain 'T' separator");
    }

    #[test]
    fn error_display() {
        let err = KithnetError::UnknownUser {
            username: "mallory".into(),
        };
        assert!(err.to_string().contains("mallory"));
    }

    #[test]
    fn only_transport_errors_are_fatal() {
        assert!(KithnetError::TransportError {
            reason: "peer closed mid-frame".into()
        }
        .is_fatal());
        assert!(!KithnetError::InvalidCredentials.is_fatal());
        assert!(!KithnetError::ProtocolError {
            reason: "invalid action".into()
        }
        .is_fatal());
    }
}
