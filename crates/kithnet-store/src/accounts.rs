//! Account store: username-keyed records with mirrored friend links.
//!
//! The store exposes exactly the contract the directory actor
//! consumes: `get`, `put_new`, `mutate`, and the paired
//! `add_friend_link` / `remove_friend_link` that mirror a graph edge
//! change into both accounts. Writes become durable at the next
//! [`flush`](AccountStore::flush) (called from the directory's
//! maintenance tick and shutdown sequence).

use std::path::Path;

use kithnet_types::{Account, KithnetError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Name of the sled tree holding account records.
const ACCOUNTS_TREE: &str = "accounts";

// ---------------------------------------------------------------------------
// AccountStore
// ---------------------------------------------------------------------------

/// sled-backed store of [`Account`] records keyed by username.
pub struct AccountStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl AccountStore {
    /// Opens (or creates) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`KithnetError::StorageError`] if the database cannot
    /// be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path).map_err(|e| KithnetError::StorageError {
            reason: format!("failed to open sled database: {e}"),
        })?;
        let tree = db
            .open_tree(ACCOUNTS_TREE)
            .map_err(|e| KithnetError::StorageError {
                reason: format!("failed to open tree '{ACCOUNTS_TREE}': {e}"),
            })?;
        Ok(Self { db, tree })
    }

    /// Retrieves an account by username.
    ///
    /// Returns `Ok(None)` if the username is not registered.
    pub fn get(&self, username: &str) -> Result<Option<Account>> {
        let raw = self
            .tree
            .get(username.as_bytes())
            .map_err(|e| KithnetError::StorageError {
                reason: format!("sled get failed: {e}"),
            })?;
        match raw {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode_account(&bytes)?)),
        }
    }

    /// Creates a new account.
    ///
    /// Returns `Ok(false)` without touching the store if the username
    /// is already taken.
    pub fn put_new(
        &self,
        username: &str,
        password_hash: &str,
        name: &str,
        photo: Option<String>,
    ) -> Result<bool> {
        if self.get(username)?.is_some() {
            return Ok(false);
        }
        let account = Account::new(username, name, photo, password_hash);
        self.write(&account)?;
        tracing::debug!(%username, "account created");
        Ok(true)
    }

    /// Applies an in-place update to an existing account.
    ///
    /// Returns `Ok(false)` if the username is not registered.
    pub fn mutate<F>(&self, username: &str, f: F) -> Result<bool>
    where
        F: FnOnce(&mut Account),
    {
        let Some(mut account) = self.get(username)? else {
            return Ok(false);
        };
        f(&mut account);
        self.write(&account)?;
        Ok(true)
    }

    /// Mirrors a new friendship edge into both accounts' friend sets.
    ///
    /// Idempotent: already-present links are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`KithnetError::UnknownUser`] if either account is
    /// absent; in that case neither account is modified.
    pub fn add_friend_link(&self, user1: &str, user2: &str) -> Result<()> {
        let (mut a, mut b) = self.get_pair(user1, user2)?;
        a.friends.insert(user2.to_string());
        b.friends.insert(user1.to_string());
        self.write(&a)?;
        self.write(&b)?;
        Ok(())
    }

    /// Removes a friendship edge from both accounts' friend sets.
    ///
    /// Idempotent: absent links are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`KithnetError::UnknownUser`] if either account is
    /// absent; in that case neither account is modified.
    pub fn remove_friend_link(&self, user1: &str, user2: &str) -> Result<()> {
        let (mut a, mut b) = self.get_pair(user1, user2)?;
        a.friends.remove(user2);
        b.friends.remove(user1);
        self.write(&a)?;
        self.write(&b)?;
        Ok(())
    }

    /// Lists every stored account.
    ///
    /// Used by user search and by the startup graph rebuild.
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        for entry in self.tree.iter() {
            let (_, bytes) = entry.map_err(|e| KithnetError::StorageError {
                reason: format!("sled iteration failed: {e}"),
            })?;
            accounts.push(decode_account(&bytes)?);
        }
        Ok(accounts)
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if no accounts are stored.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Flushes all pending writes to disk.
    ///
    /// # Errors
    ///
    /// Returns [`KithnetError::StorageError`] if the flush fails.
    pub fn flush(&self) -> Result<()> {
        self.db.flush().map_err(|e| KithnetError::StorageError {
            reason: format!("failed to flush database: {e}"),
        })?;
        Ok(())
    }

    fn get_pair(&self, user1: &str, user2: &str) -> Result<(Account, Account)> {
        let a = self.get(user1)?.ok_or_else(|| KithnetError::UnknownUser {
            username: user1.to_string(),
        })?;
        let b = self.get(user2)?.ok_or_else(|| KithnetError::UnknownUser {
            username: user2.to_string(),
        })?;
        Ok((a, b))
    }

    fn write(&self, account: &Account) -> Result<()> {
        let bytes = bincode::serialize(account).map_err(|e| KithnetError::StorageError {
            reason: format!("account serialization failed: {e}"),
        })?;
        self.tree
            .insert(account.username.as_bytes(), bytes)
            .map_err(|e| KithnetError::StorageError {
                reason: format!("sled insert failed: {e}"),
            })?;
        Ok(())
    }
}

fn decode_account(bytes: &[u8]) -> Result<Account> {
    bincode::deserialize(bytes).map_err(|e| KithnetError::StorageError {
        reason: format!("account deserialization failed: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
