//! The [`LockStore`] trait defining the storage contract for the lock table.
//!
//! The table holds at most one row per [`LockKey`]. Rows are never judged
//! here except inside [`LockStore::try_insert`], which must perform its
//! check and its write as one indivisible step; every other method is plain
//! row access.
//!
//! All backends (InMemoryStore, SqliteStore) implement this trait, so the
//! lock manager can be wired to either without changing its logic.

use chrono::{DateTime, Utc};

use entlock_core::{LockKey, LockRecord, LockToken, UserId};

use crate::error::StorageError;

/// Result of an atomic check-and-insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The candidate record now occupies the key.
    Inserted,
    /// A valid lock held by another user occupies the key; nothing changed.
    Held(LockRecord),
}

/// Shared, concurrently accessible lock table.
pub trait LockStore: Send + Sync {
    /// Installs `record` under its key unless the key is occupied by a lock
    /// that is still valid at `now` and held by a different user.
    ///
    /// Expired rows and rows held by the same user are replaced.
    fn try_insert(
        &self,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> Result<InsertOutcome, StorageError>;

    /// Returns the row stored under `key`, expired or not.
    fn get(&self, key: &LockKey) -> Result<Option<LockRecord>, StorageError>;

    /// Deletes the row under `key` only if its token equals `token`.
    ///
    /// Returns the removed row, or `None` if nothing matched.
    fn remove_if_token(
        &self,
        key: &LockKey,
        token: &LockToken,
    ) -> Result<Option<LockRecord>, StorageError>;

    /// Deletes every row held by `holder` and returns their keys.
    fn remove_held_by(&self, holder: &UserId) -> Result<Vec<LockKey>, StorageError>;

    /// Returns every row, sorted by key.
    fn list(&self) -> Result<Vec<LockRecord>, StorageError>;

    /// Deletes the rows expired at `now` and returns their keys, sorted.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<LockKey>, StorageError>;
}
