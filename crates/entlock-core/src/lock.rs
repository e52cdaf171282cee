//! Lock records and their tokenless projection.
//!
//! A [`LockRecord`] is the full row of the lock table, including the
//! [`LockToken`] credential. [`LockInfo`] is what callers other than the
//! holder get to see.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::id::{EntityId, EntityType, LockKey, UserId};

/// Lifetime of every lock, in seconds.
pub const LOCK_TTL_SECS: i64 = 7200;

/// Lifetime of every lock.
pub fn lock_ttl() -> Duration {
    Duration::seconds(LOCK_TTL_SECS)
}

/// Opaque credential proving ownership of a lock.
///
/// The `Debug` output is redacted so records can be traced safely.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockToken(String);

impl LockToken {
    /// Generates a fresh random token.
    pub fn generate() -> Self {
        LockToken(Uuid::new_v4().simple().to_string())
    }

    /// Wraps a token presented by a caller.
    pub fn parse(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CoreError::InvalidToken {
                reason: "must not be empty".to_string(),
            });
        }
        Ok(LockToken(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LockToken(..)")
    }
}

/// A lock held on one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub key: LockKey,
    pub token: LockToken,
    /// The acquiring user.
    pub holder: UserId,
    /// Why the lock was taken.
    pub info: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LockRecord {
    /// Builds a new record with a fresh token, expiring `ttl` after `now`.
    pub fn new(
        key: LockKey,
        holder: UserId,
        info: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        LockRecord {
            key,
            token: LockToken::generate(),
            holder,
            info: info.into(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// A lock is valid strictly before its expiration timestamp.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_valid_at(now)
    }

    pub fn is_held_by(&self, user: &UserId) -> bool {
        self.holder == *user
    }

    /// Tokenless projection of this record.
    pub fn info(&self) -> LockInfo {
        LockInfo {
            entity_type: self.key.entity_type.clone(),
            entity_id: self.key.entity_id,
            info: self.info.clone(),
            holder: self.holder,
            expires_at: self.expires_at,
        }
    }
}

/// Lock status as reported to callers. Never carries the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub info: String,
    pub holder: UserId,
    pub expires_at: DateTime<Utc>,
}
