//! Exclusive edit locks on persisted entities with TTL-based expiry.
//!
//! [`LockManager`] grants, validates and releases locks keyed by
//! `(entity type, id)`. Expiry is judged lazily by comparing the injected
//! clock against each record's `expires_at`; the optional sweep task only
//! removes rows that are already invalid.

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};

use entlock_core::{
    lock_ttl, Clock, EntityId, EntityType, LockInfo, LockKey, LockRecord, LockToken, UserId,
};
use entlock_storage::{InsertOutcome, LockStore, StorageError};

/// Errors from lock operations.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another user holds a valid lock on the entity.
    #[error(
        "{}#{} is locked by user {} until {}",
        .0.entity_type, .0.entity_id, .0.holder, .0.expires_at
    )]
    Conflict(LockInfo),

    /// The presented token refers to a lock that has expired.
    #[error("lock on {key} expired at {expired_at}")]
    Expired {
        key: LockKey,
        expired_at: DateTime<Utc>,
    },

    /// The presented token does not match the current holder.
    #[error("lock token does not match the holder of {key}")]
    Mismatch { key: LockKey },

    /// The lock table could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Entity lock manager over an injectable store and clock.
pub struct LockManager {
    store: Arc<dyn LockStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl LockManager {
    /// Creates a lock manager with the given TTL.
    pub fn new(store: Arc<dyn LockStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        LockManager { store, clock, ttl }
    }

    /// Creates a lock manager with the fixed 7200-second TTL.
    pub fn with_default_ttl(store: Arc<dyn LockStore>, clock: Arc<dyn Clock>) -> Self {
        Self::new(store, clock, lock_ttl())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // Millisecond precision matches what the SQLite backend can store.
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(3)
    }

    /// Takes the lock on `(entity_type, entity_id)` for `user`.
    ///
    /// Succeeds when the key is free, expired, or already held by `user`; in
    /// the last case the old record is replaced by a new one with a new
    /// token and a fresh expiry.
    pub fn acquire(
        &self,
        entity_type: &EntityType,
        entity_id: EntityId,
        user: UserId,
        info: impl Into<String>,
    ) -> Result<LockRecord, LockError> {
        let now = self.now();
        let record = LockRecord::new(
            LockKey::new(entity_type.clone(), entity_id),
            user,
            info,
            now,
            self.ttl,
        );

        match self.store.try_insert(&record, now)? {
            InsertOutcome::Inserted => {
                tracing::info!(
                    entity = %record.key,
                    user = %user,
                    expires_at = %record.expires_at,
                    "lock acquired"
                );
                Ok(record)
            }
            InsertOutcome::Held(existing) => {
                tracing::debug!(
                    entity = %existing.key,
                    user = %user,
                    holder = %existing.holder,
                    "lock denied"
                );
                Err(LockError::Conflict(existing.info()))
            }
        }
    }

    /// Checks that `token` is the credential of a currently valid lock.
    pub fn validate(
        &self,
        token: &LockToken,
        entity_type: &EntityType,
        entity_id: EntityId,
    ) -> Result<LockRecord, LockError> {
        let key = LockKey::new(entity_type.clone(), entity_id);
        let record = match self.store.get(&key)? {
            Some(record) if record.token == *token => record,
            _ => return Err(LockError::Mismatch { key }),
        };

        if record.is_expired_at(self.now()) {
            return Err(LockError::Expired {
                key,
                expired_at: record.expires_at,
            });
        }
        Ok(record)
    }

    /// Releases the lock if `token` matches its holder, expired or not.
    pub fn release(
        &self,
        token: &LockToken,
        entity_type: &EntityType,
        entity_id: EntityId,
    ) -> Result<(), LockError> {
        let key = LockKey::new(entity_type.clone(), entity_id);
        match self.store.remove_if_token(&key, token)? {
            Some(record) => {
                tracing::info!(entity = %key, user = %record.holder, "lock released");
                Ok(())
            }
            None => Err(LockError::Mismatch { key }),
        }
    }

    /// Reports the valid lock on an entity, if any. Never mutates the table.
    pub fn describe(
        &self,
        entity_type: &EntityType,
        entity_id: EntityId,
    ) -> Result<Option<LockInfo>, LockError> {
        let key = LockKey::new(entity_type.clone(), entity_id);
        let now = self.now();
        Ok(self
            .store
            .get(&key)?
            .filter(|record| record.is_valid_at(now))
            .map(|record| record.info()))
    }

    /// Returns the status of every currently valid lock.
    pub fn list_active(&self) -> Result<Vec<LockInfo>, LockError> {
        let now = self.now();
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(|record| record.is_valid_at(now))
            .map(|record| record.info())
            .collect())
    }

    /// Releases every lock held by `user`, valid or expired.
    pub fn release_all_for(&self, user: &UserId) -> Result<Vec<LockKey>, LockError> {
        let released = self.store.remove_held_by(user)?;
        if !released.is_empty() {
            tracing::info!(user = %user, count = released.len(), "released all locks for user");
        }
        Ok(released)
    }

    /// Removes expired rows and returns their keys.
    pub fn sweep_expired_locks(&self) -> Result<Vec<LockKey>, LockError> {
        Ok(self.store.purge_expired(self.now())?)
    }

    /// Spawns a background tokio task that periodically sweeps expired locks.
    pub fn start_expiry_sweep(
        self: &Arc<Self>,
        interval: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tick.tick().await;
                match manager.sweep_expired_locks() {
                    Ok(released) if !released.is_empty() => {
                        tracing::info!("Swept {} expired lock(s)", released.len());
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "lock sweep failed"),
                }
            }
        })
    }
}
