//! Storage error types for entlock-storage.
//!
//! [`StorageError`] covers backend failures (SQLite, migrations, a poisoned
//! connection mutex) and rows that no longer decode into a valid
//! [`LockRecord`](entlock_core::LockRecord).

use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A thread panicked while holding the connection.
    #[error("storage connection poisoned")]
    Poisoned,

    /// A stored row could not be decoded.
    #[error("corrupt lock row: {reason}")]
    Corrupt { reason: String },

    /// A stored value failed domain validation.
    #[error(transparent)]
    Core(#[from] entlock_core::CoreError),
}
