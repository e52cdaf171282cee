//! Core data model for entity edit locks.
//!
//! Defines the identifiers of lockable entities, the [`LockRecord`] row and
//! its tokenless [`LockInfo`] projection, and the injectable [`Clock`] used
//! to judge expiration.

pub mod clock;
pub mod error;
pub mod id;
pub mod lock;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CoreError;
pub use id::{EntityId, EntityType, LockKey, UserId};
pub use lock::{lock_ttl, LockInfo, LockRecord, LockToken, LOCK_TTL_SECS};
