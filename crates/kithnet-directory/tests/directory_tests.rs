//! Integration tests for the directory actor.
//!
//! Every test drives a real directory through its command channel,
//! backed by a throwaway sled store. Registration uses the production
//! Argon2id hasher, so tests keep account counts small.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use kithnet_directory::{Directory, DirectoryCommand};
use kithnet_graph::GraphStats;
use kithnet_protocol::message::{FriendSummary, SuggestionEntry, UserProfile};
use kithnet_store::AccountStore;
use kithnet_types::KithnetError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type KResult<T> = std::result::Result<T, KithnetError>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Returns a unique temporary directory for each test.
fn temp_dir() -> PathBuf {
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "kithnet-directory-test-{}-{}-{}",
        std::process::id(),
        id,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    ));
    let _ = std::fs::create_dir_all(&dir);
    dir
}

struct TestDirectory {
    tx: mpsc::Sender<DirectoryCommand>,
    handle: JoinHandle<()>,
    dir: PathBuf,
    directory: Directory,
}

fn start_directory() -> TestDirectory {
    start_directory_at(temp_dir())
}

fn start_directory_at(dir: PathBuf) -> TestDirectory {
    let store = AccountStore::open(&dir).unwrap_or_else(|e| panic!("open store: {e}"));
    let mut directory = Directory::new(store).unwrap_or_else(|e| panic!("new directory: {e}"));
    let handle = directory
        .start()
        .unwrap_or_else(|e| panic!("start directory: {e}"));
    let tx = directory.command_sender();
    TestDirectory {
        tx,
        handle,
        dir,
        directory,
    }
}

async fn register(tx: &mpsc::Sender<DirectoryCommand>, username: &str, name: &str) -> KResult<()> {
    let (reply, rx) = oneshot::channel();
    tx.send(DirectoryCommand::Register {
        username: username.into(),
        password: format!("{username}-password"),
        name: name.into(),
        photo: None,
        reply,
    })
    .await
    .unwrap_or_else(|e| panic!("send: {e}"));
    rx.await.unwrap_or_else(|e| panic!("reply dropped: {e}"))
}

async fn login(
    tx: &mpsc::Sender<DirectoryCommand>,
    username: &str,
    password: &str,
) -> KResult<UserProfile> {
    let (reply, rx) = oneshot::channel();
    tx.send(DirectoryCommand::Login {
        username: username.into(),
        password: password.into(),
        reply,
    })
    .await
    .unwrap_or_else(|e| panic!("send: {e}"));
    rx.await.unwrap_or_else(|e| panic!("reply dropped: {e}"))
}

async fn add_friend(
    tx: &mpsc::Sender<DirectoryCommand>,
    user1: &str,
    user2: &str,
) -> KResult<bool> {
    let (reply, rx) = oneshot::channel();
    tx.send(DirectoryCommand::AddFriend {
        user1: user1.into(),
        user2: user2.into(),
        reply,
    })
    .await
    .unwrap_or_else(|e| panic!("send: {e}"));
    rx.await.unwrap_or_else(|e| panic!("reply dropped: {e}"))
}

async fn remove_friend(
    tx: &mpsc::Sender<DirectoryCommand>,
    user1: &str,
    user2: &str,
) -> KResult<()> {
    let (reply, rx) = oneshot::channel();
    tx.send(DirectoryCommand::RemoveFriend {
        user1: user1.into(),
        user2: user2.into(),
        reply,
    })
    .await
    .unwrap_or_else(|e| panic!("send: {e}"));
    rx.await.unwrap_or_else(|e| panic!("reply dropped: {e}"))
}

async fn get_friends(
    tx: &mpsc::Sender<DirectoryCommand>,
    username: &str,
) -> KResult<Vec<FriendSummary>> {
    let (reply, rx) = oneshot::channel();
    tx.send(DirectoryCommand::GetFriends {
        username: username.into(),
        reply,
    })
    .await
    .unwrap_or_else(|e| panic!("send: {e}"));
    rx.await.unwrap_or_else(|e| panic!("reply dropped: {e}"))
}

async fn find_path(
    tx: &mpsc::Sender<DirectoryCommand>,
    start: &str,
    end: &str,
) -> KResult<Vec<String>> {
    let (reply, rx) = oneshot::channel();
    tx.send(DirectoryCommand::FindPath {
        start: start.into(),
        end: end.into(),
        reply,
    })
    .await
    .unwrap_or_else(|e| panic!("send: {e}"));
    rx.await.unwrap_or_else(|e| panic!("reply dropped: {e}"))
}

async fn get_stats(tx: &mpsc::Sender<DirectoryCommand>) -> GraphStats {
    let (reply, rx) = oneshot::channel();
    tx.send(DirectoryCommand::GetStats { reply })
        .await
        .unwrap_or_else(|e| panic!("send: {e}"));
    rx.await.unwrap_or_else(|e| panic!("reply dropped: {e}"))
}

async fn get_suggestions(
    tx: &mpsc::Sender<DirectoryCommand>,
    username: &str,
) -> KResult<Vec<SuggestionEntry>> {
    let (reply, rx) = oneshot::channel();
    tx.send(DirectoryCommand::GetSuggestions {
        username: username.into(),
        reply,
    })
    .await
    .unwrap_or_else(|e| panic!("send: {e}"));
    rx.await.unwrap_or_else(|e| panic!("reply dropped: {e}"))
}

/// Asserts the bidirectional-consistency invariant for a pair through
/// the public API: u lists v as a friend iff v lists u.
async fn assert_mutual(tx: &mpsc::Sender<DirectoryCommand>, u: &str, v: &str, expected: bool) {
    let u_friends = get_friends(tx, u).await.unwrap_or_else(|e| panic!("{e}"));
    let v_friends = get_friends(tx, v).await.unwrap_or_else(|e| panic!("{e}"));
    let u_has_v = u_friends.iter().any(|f| f.username == v);
    let v_has_u = v_friends.iter().any(|f| f.username == u);
    assert_eq!(u_has_v, expected, "{u} -> {v} friendship mismatch");
    assert_eq!(v_has_u, expected, "{v} -> {u} friendship mismatch");
}

// ---------------------------------------------------------------------------
// Account tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_then_login() {
    let test = start_directory();

    register(&test.tx, "alice", "Alice").await.unwrap_or_else(|e| panic!("{e}"));

    let profile = login(&test.tx, "alice", "alice-password")
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(profile.username, "alice");
    assert_eq!(profile.name, "Alice");
    assert!(profile.friends.is_empty());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let test = start_directory();
    register(&test.tx, "alice", "Alice").await.unwrap_or_else(|e| panic!("{e}"));

    let wrong_password = login(&test.tx, "alice", "nope").await.expect_err("must fail");
    let unknown_user = login(&test.tx, "ghost", "nope").await.expect_err("must fail");
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
}

#[tokio::test]
async fn duplicate_registration_rejected() {
    let test = start_directory();
    register(&test.tx, "alice", "Alice").await.unwrap_or_else(|e| panic!("{e}"));

    let err = register(&test.tx, "alice", "Impostor").await.expect_err("must fail");
    assert!(err.to_string().contains("already exists"));

    // The original profile survives.
    let profile = login(&test.tx, "alice", "alice-password")
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(profile.name, "Alice");
}

#[tokio::test]
async fn update_profile_touches_only_provided_fields() {
    let test = start_directory();
    register(&test.tx, "alice", "Alice").await.unwrap_or_else(|e| panic!("{e}"));

    let (reply, rx) = oneshot::channel();
    test.tx
        .send(DirectoryCommand::UpdateProfile {
            username: "alice".into(),
            name: Some("Alice W".into()),
            photo: None,
            reply,
        })
        .await
        .unwrap_or_else(|e| panic!("send: {e}"));
    let profile = rx
        .await
        .unwrap_or_else(|e| panic!("reply dropped: {e}"))
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(profile.name, "Alice W");
    assert_eq!(profile.photo, None);

    let (reply, rx) = oneshot::channel();
    test.tx
        .send(DirectoryCommand::UpdateProfile {
            username: "ghost".into(),
            name: Some("x".into()),
            photo: None,
            reply,
        })
        .await
        .unwrap_or_else(|e| panic!("send: {e}"));
    assert!(rx.await.unwrap_or_else(|e| panic!("reply dropped: {e}")).is_err());
}

#[tokio::test]
async fn change_password_requires_old_password() {
    let test = start_directory();
    register(&test.tx, "alice", "Alice").await.unwrap_or_else(|e| panic!("{e}"));

    let (reply, rx) = oneshot::channel();
    test.tx
        .send(DirectoryCommand::ChangePassword {
            username: "alice".into(),
            old_password: "wrong".into(),
            new_password: "next".into(),
            reply,
        })
        .await
        .unwrap_or_else(|e| panic!("send: {e}"));
    assert!(rx.await.unwrap_or_else(|e| panic!("reply dropped: {e}")).is_err());

    let (reply, rx) = oneshot::channel();
    test.tx
        .send(DirectoryCommand::ChangePassword {
            username: "alice".into(),
            old_password: "alice-password".into(),
            new_password: "next".into(),
            reply,
        })
        .await
        .unwrap_or_else(|e| panic!("send: {e}"));
    rx.await
        .unwrap_or_else(|e| panic!("reply dropped: {e}"))
        .unwrap_or_else(|e| panic!("{e}"));

    assert!(login(&test.tx, "alice", "alice-password").await.is_err());
    login(&test.tx, "alice", "next")
        .await
        .unwrap_or_else(|e| panic!("{e}"));
}

// ---------------------------------------------------------------------------
// Friendship and query tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_register_befriend_path_stats() {
    let test = start_directory();
    for (username, name) in [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol")] {
        register(&test.tx, username, name).await.unwrap_or_else(|e| panic!("{e}"));
    }

    assert!(add_friend(&test.tx, "alice", "bob").await.unwrap_or_else(|e| panic!("{e}")));
    assert!(add_friend(&test.tx, "bob", "carol").await.unwrap_or_else(|e| panic!("{e}")));

    let path = find_path(&test.tx, "alice", "carol")
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(path, vec!["alice", "bob", "carol"]);

    let stats = get_stats(&test.tx).await;
    let max = stats.max.expect("max present");
    assert_eq!((max.username.as_str(), max.degree), ("bob", 2));
    let min = stats.min.expect("min present");
    assert_eq!(min.degree, 1);
    assert!((stats.avg - 4.0 / 3.0).abs() < 1e-9);

    // Friends of bob carry per-friend degree counts.
    let friends = get_friends(&test.tx, "bob").await.unwrap_or_else(|e| panic!("{e}"));
    let names: Vec<&str> = friends.iter().map(|f| f.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "carol"]);
    assert!(friends.iter().all(|f| f.friend_count == 1));
}

#[tokio::test]
async fn add_friend_is_idempotent_and_mutual() {
    let test = start_directory();
    register(&test.tx, "alice", "Alice").await.unwrap_or_else(|e| panic!("{e}"));
    register(&test.tx, "bob", "Bob").await.unwrap_or_else(|e| panic!("{e}"));

    assert!(add_friend(&test.tx, "alice", "bob").await.unwrap_or_else(|e| panic!("{e}")));
    // Second add is a reported no-op, not an error.
    assert!(!add_friend(&test.tx, "alice", "bob").await.unwrap_or_else(|e| panic!("{e}")));
    assert_mutual(&test.tx, "alice", "bob", true).await;

    let friends = get_friends(&test.tx, "alice").await.unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(friends.len(), 1);
}

#[tokio::test]
async fn remove_missing_friendship_fails_without_side_effects() {
    let test = start_directory();
    register(&test.tx, "alice", "Alice").await.unwrap_or_else(|e| panic!("{e}"));
    register(&test.tx, "bob", "Bob").await.unwrap_or_else(|e| panic!("{e}"));

    assert!(remove_friend(&test.tx, "alice", "bob").await.is_err());
    assert_mutual(&test.tx, "alice", "bob", false).await;

    add_friend(&test.tx, "alice", "bob").await.unwrap_or_else(|e| panic!("{e}"));
    remove_friend(&test.tx, "alice", "bob")
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    assert_mutual(&test.tx, "alice", "bob", false).await;
}

#[tokio::test]
async fn friendship_with_unknown_user_rejected() {
    let test = start_directory();
    register(&test.tx, "alice", "Alice").await.unwrap_or_else(|e| panic!("{e}"));

    let err = add_friend(&test.tx, "alice", "ghost").await.expect_err("must fail");
    assert!(err.to_string().contains("ghost"));
}

#[tokio::test]
async fn suggestions_are_ranked_and_decorated() {
    let test = start_directory();
    for (username, name) in [
        ("alice", "Alice"),
        ("bob", "Bob"),
        ("carol", "Carol"),
        ("dave", "Dave"),
    ] {
        register(&test.tx, username, name).await.unwrap_or_else(|e| panic!("{e}"));
    }
    // Square: alice-bob, alice-carol, bob-dave, carol-dave.
    for (u, v) in [("alice", "bob"), ("alice", "carol"), ("bob", "dave"), ("carol", "dave")] {
        add_friend(&test.tx, u, v).await.unwrap_or_else(|e| panic!("{e}"));
    }

    let suggestions = get_suggestions(&test.tx, "alice")
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].username, "dave");
    assert_eq!(suggestions[0].name, "Dave");
    assert_eq!(suggestions[0].common_friends, 2);
    assert_eq!(suggestions[0].friend_count, 2);

    assert!(get_suggestions(&test.tx, "ghost").await.is_err());
}

#[tokio::test]
async fn search_matches_username_and_name_excluding_self() {
    let test = start_directory();
    register(&test.tx, "alice", "Alice Wonder").await.unwrap_or_else(|e| panic!("{e}"));
    register(&test.tx, "alina", "Someone Else").await.unwrap_or_else(|e| panic!("{e}"));
    register(&test.tx, "bob", "Ali Baba").await.unwrap_or_else(|e| panic!("{e}"));
    add_friend(&test.tx, "alice", "bob").await.unwrap_or_else(|e| panic!("{e}"));

    let (reply, rx) = oneshot::channel();
    test.tx
        .send(DirectoryCommand::SearchUsers {
            query: "ALI".into(),
            current_user: "alice".into(),
            reply,
        })
        .await
        .unwrap_or_else(|e| panic!("send: {e}"));
    let results = rx
        .await
        .unwrap_or_else(|e| panic!("reply dropped: {e}"))
        .unwrap_or_else(|e| panic!("{e}"));

    // "alina" by username, "bob" by display name; "alice" excluded.
    let names: Vec<&str> = results.iter().map(|r| r.username.as_str()).collect();
    assert_eq!(names, vec!["alina", "bob"]);
    let bob = results.iter().find(|r| r.username == "bob").expect("bob in results");
    assert!(bob.is_friend);
    let alina = results.iter().find(|r| r.username == "alina").expect("alina in results");
    assert!(!alina.is_friend);
}

#[tokio::test]
async fn find_path_without_route_is_error() {
    let test = start_directory();
    register(&test.tx, "alice", "Alice").await.unwrap_or_else(|e| panic!("{e}"));
    register(&test.tx, "bob", "Bob").await.unwrap_or_else(|e| panic!("{e}"));

    assert!(find_path(&test.tx, "alice", "bob").await.is_err());
    assert!(find_path(&test.tx, "alice", "ghost").await.is_err());

    let path = find_path(&test.tx, "alice", "alice")
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(path, vec!["alice"]);
}

// ---------------------------------------------------------------------------
// Concurrency and persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_mutations_on_disjoint_pairs_keep_invariant() {
    let test = start_directory();

    // Four disjoint pairs: user0/user1, user2/user3, ...
    for i in 0..8 {
        register(&test.tx, &format!("user{i}"), &format!("User {i}"))
            .await
            .unwrap_or_else(|e| panic!("{e}"));
    }

    let mut tasks = Vec::new();
    for pair in 0..4 {
        let tx = test.tx.clone();
        let (u, v) = (format!("user{}", pair * 2), format!("user{}", pair * 2 + 1));
        tasks.push(tokio::spawn(async move {
            for _ in 0..10 {
                add_friend(&tx, &u, &v).await.unwrap_or_else(|e| panic!("{e}"));
                remove_friend(&tx, &u, &v).await.unwrap_or_else(|e| panic!("{e}"));
            }
            add_friend(&tx, &u, &v).await.unwrap_or_else(|e| panic!("{e}"));
        }));
    }
    for task in tasks {
        task.await.unwrap_or_else(|e| panic!("task panicked: {e}"));
    }

    // Every pair ends friends, mutually, and with degree exactly 1.
    for pair in 0..4 {
        let (u, v) = (format!("user{}", pair * 2), format!("user{}", pair * 2 + 1));
        assert_mutual(&test.tx, &u, &v, true).await;
        let friends = get_friends(&test.tx, &u).await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(friends.len(), 1);
    }

    let stats = get_stats(&test.tx).await;
    assert!((stats.avg - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn shutdown_flushes_and_state_survives_restart() {
    let test = start_directory();
    register(&test.tx, "alice", "Alice").await.unwrap_or_else(|e| panic!("{e}"));
    register(&test.tx, "bob", "Bob").await.unwrap_or_else(|e| panic!("{e}"));
    add_friend(&test.tx, "alice", "bob").await.unwrap_or_else(|e| panic!("{e}"));

    test.tx
        .send(DirectoryCommand::Shutdown)
        .await
        .unwrap_or_else(|e| panic!("send: {e}"));
    test.handle.await.unwrap_or_else(|e| panic!("join: {e}"));

    // Reopen the same store: accounts, friendships, and the rebuilt
    // graph must all be back.
    let restarted = start_directory_at(test.dir.clone());
    assert_mutual(&restarted.tx, "alice", "bob", true).await;
    let path = find_path(&restarted.tx, "alice", "bob")
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(path, vec!["alice", "bob"]);
}

#[tokio::test]
async fn watch_shutdown_stops_event_loop() {
    let mut test = start_directory();
    register(&test.tx, "alice", "Alice").await.unwrap_or_else(|e| panic!("{e}"));

    test.directory.shutdown().unwrap_or_else(|e| panic!("{e}"));
    test.handle.await.unwrap_or_else(|e| panic!("join: {e}"));
}
