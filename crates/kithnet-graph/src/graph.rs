//! The friendship graph: structure, mutation, and the three queries.
//!
//! Adjacency is kept as sorted sets, so every traversal visits
//! neighbors in lexicographic order. All tie-breaks (equal-length
//! shortest paths, max/min-degree ties, equal-rank suggestions) are
//! therefore deterministic: the lexicographically smallest candidate
//! wins.

use std::collections::{BTreeSet, HashMap, VecDeque};

use kithnet_types::{KithnetError, Result};
use serde::{Deserialize, Serialize};

/// Maximum number of friend suggestions returned per query.
pub const MAX_SUGGESTIONS: usize = 10;

// ---------------------------------------------------------------------------
// Query result types
// ---------------------------------------------------------------------------

/// A username paired with its degree (friend count).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DegreeEntry {
    /// The node.
    pub username: String,
    /// Number of edges incident to the node.
    pub degree: usize,
}

/// Graph-wide degree statistics.
///
/// `max` and `min` are `None` exactly when the graph is empty, in
/// which case `avg` is `0.0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    /// A node of maximum degree (lexicographically smallest on ties).
    pub max: Option<DegreeEntry>,
    /// A node of minimum degree (lexicographically smallest on ties).
    pub min: Option<DegreeEntry>,
    /// Arithmetic mean degree over all nodes.
    pub avg: f64,
}

/// A friend-suggestion candidate produced by common-neighbor counting.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SuggestionCandidate {
    /// The suggested user.
    pub username: String,
    /// Number of friends shared with the querying user.
    pub common_friends: usize,
}

// ---------------------------------------------------------------------------
// SocialGraph
// ---------------------------------------------------------------------------

/// Simple, undirected, unweighted graph over usernames.
///
/// Invariants maintained by the mutation API:
///
/// - no self-loops, no parallel edges;
/// - `v ∈ adjacency[u] ⇔ u ∈ adjacency[v]` (edges are symmetric);
/// - every endpoint of an edge is a node.
#[derive(Clone, Debug, Default)]
pub struct SocialGraph {
    adjacency: HashMap<String, BTreeSet<String>>,
}

impl SocialGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Returns `true` if `username` is a node.
    pub fn contains(&self, username: &str) -> bool {
        self.adjacency.contains_key(username)
    }

    /// Degree of a node, or `None` if it is not in the graph.
    pub fn degree(&self, username: &str) -> Option<usize> {
        self.adjacency.get(username).map(BTreeSet::len)
    }

    /// Neighbors of a node, or `None` if it is not in the graph.
    pub fn neighbors(&self, username: &str) -> Option<&BTreeSet<String>> {
        self.adjacency.get(username)
    }

    /// Inserts an isolated node if absent.
    ///
    /// Idempotent. Returns `true` if a new node was created.
    pub fn add_user(&mut self, username: &str) -> bool {
        if self.adjacency.contains_key(username) {
            return false;
        }
        self.adjacency.insert(username.to_string(), BTreeSet::new());
        true
    }

    /// Adds the undirected edge `(user1, user2)`.
    ///
    /// Both endpoints must already be nodes. Adding an edge that
    /// already exists is a no-op reported as `Ok(false)`; a newly
    /// created edge is `Ok(true)`. The caller uses this to decide
    /// whether the account store needs the mirrored update.
    ///
    /// # Errors
    ///
    /// - [`KithnetError::InvalidRequest`] on a self-loop.
    /// - [`KithnetError::UnknownUser`] if either endpoint is absent.
    pub fn add_friendship(&mut self, user1: &str, user2: &str) -> Result<bool> {
        self.check_endpoints(user1, user2)?;

        let mut inserted = false;
        if let Some(set) = self.adjacency.get_mut(user1) {
            inserted = set.insert(user2.to_string());
        }
        if let Some(set) = self.adjacency.get_mut(user2) {
            set.insert(user1.to_string());
        }
        Ok(inserted)
    }

    /// Removes the undirected edge `(user1, user2)`.
    ///
    /// Both endpoints must already be nodes. Removing an edge that
    /// does not exist is a no-op reported as `Ok(false)` so the caller
    /// skips the mirrored account-store mutation.
    ///
    /// # Errors
    ///
    /// - [`KithnetError::InvalidRequest`] on a self-loop.
    /// - [`KithnetError::UnknownUser`] if either endpoint is absent.
    pub fn remove_friendship(&mut self, user1: &str, user2: &str) -> Result<bool> {
        self.check_endpoints(user1, user2)?;

        let mut removed = false;
        if let Some(set) = self.adjacency.get_mut(user1) {
            removed = set.remove(user2);
        }
        if let Some(set) = self.adjacency.get_mut(user2) {
            set.remove(user1);
        }
        Ok(removed)
    }

    fn check_endpoints(&self, user1: &str, user2: &str) -> Result<()> {
        if user1 == user2 {
            return Err(KithnetError::InvalidRequest {
                reason: "cannot befriend yourself".into(),
            });
        }
        for user in [user1, user2] {
            if !self.adjacency.contains_key(user) {
                return Err(KithnetError::UnknownUser {
                    username: user.to_string(),
                });
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Shortest path
    // -----------------------------------------------------------------------

    /// Shortest path from `start` to `end` by edge count, inclusive of
    /// both endpoints.
    ///
    /// Breadth-first search with neighbors visited in lexicographic
    /// order, so among several equal-length paths the result is
    /// deterministic. Returns `None` if either endpoint is absent or
    /// the endpoints are in different connected components.
    /// `shortest_path(a, a)` is `Some([a])` for any node `a`.
    pub fn shortest_path(&self, start: &str, end: &str) -> Option<Vec<String>> {
        if !self.contains(start) || !self.contains(end) {
            return None;
        }
        if start == end {
            return Some(vec![start.to_string()]);
        }

        let mut predecessor: HashMap<&str, &str> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        predecessor.insert(start, start);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for neighbor in &self.adjacency[current] {
                if predecessor.contains_key(neighbor.as_str()) {
                    continue;
                }
                predecessor.insert(neighbor, current);
                if neighbor == end {
                    return Some(Self::reconstruct(&predecessor, start, end));
                }
                queue.push_back(neighbor);
            }
        }

        None
    }

    fn reconstruct(predecessor: &HashMap<&str, &str>, start: &str, end: &str) -> Vec<String> {
        let mut path = vec![end.to_string()];
        let mut current = end;
        while current != start {
            current = predecessor[current];
            path.push(current.to_string());
        }
        path.reverse();
        path
    }

    // -----------------------------------------------------------------------
    // Degree statistics
    // -----------------------------------------------------------------------

    /// Computes max/min-degree nodes and the mean degree.
    ///
    /// The empty graph yields the sentinel result: no max, no min,
    /// average `0.0`.
    pub fn degree_stats(&self) -> GraphStats {
        if self.adjacency.is_empty() {
            return GraphStats {
                max: None,
                min: None,
                avg: 0.0,
            };
        }

        let mut max: Option<DegreeEntry> = None;
        let mut min: Option<DegreeEntry> = None;
        let mut total = 0usize;

        for (username, neighbors) in &self.adjacency {
            let degree = neighbors.len();
            total += degree;

            let better_max = match &max {
                None => true,
                Some(m) => degree > m.degree || (degree == m.degree && username < &m.username),
            };
            if better_max {
                max = Some(DegreeEntry {
                    username: username.clone(),
                    degree,
                });
            }

            let better_min = match &min {
                None => true,
                Some(m) => degree < m.degree || (degree == m.degree && username < &m.username),
            };
            if better_min {
                min = Some(DegreeEntry {
                    username: username.clone(),
                    degree,
                });
            }
        }

        GraphStats {
            max,
            min,
            avg: total as f64 / self.adjacency.len() as f64,
        }
    }

    // -----------------------------------------------------------------------
    // Friend suggestions
    // -----------------------------------------------------------------------

    /// Common-neighbor friend suggestions for `username`.
    ///
    /// For every friend `f` of the user, every `g ∈ friends(f)` that
    /// is neither the user nor already a friend gains one counted
    /// common friend. Candidates are ranked by common-friend count
    /// descending, ties by username ascending, and capped at
    /// [`MAX_SUGGESTIONS`]. A user with no friends (or absent from the
    /// graph) yields no suggestions.
    pub fn suggestions(&self, username: &str) -> Vec<SuggestionCandidate> {
        let Some(friends) = self.adjacency.get(username) else {
            return Vec::new();
        };

        let mut counters: HashMap<&str, usize> = HashMap::new();
        for friend in friends {
            for candidate in &self.adjacency[friend] {
                if candidate == username || friends.contains(candidate) {
                    continue;
                }
                *counters.entry(candidate).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<SuggestionCandidate> = counters
            .into_iter()
            .map(|(username, common_friends)| SuggestionCandidate {
                username: username.to_string(),
                common_friends,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.common_friends
                .cmp(&a.common_friends)
                .then_with(|| a.username.cmp(&b.username))
        });
        ranked.truncate(MAX_SUGGESTIONS);
        ranked
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
