//! In-memory implementation of [`LockStore`].
//!
//! [`InMemoryStore`] is the default backend when no database path is
//! configured, and the backend used by most tests. It keeps the table in a
//! `DashMap`, whose per-shard entry guard makes [`LockStore::try_insert`]
//! atomic without a global lock.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use entlock_core::{LockKey, LockRecord, LockToken, UserId};

use crate::error::StorageError;
use crate::traits::{InsertOutcome, LockStore};

/// DashMap-backed lock table.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    locks: DashMap<LockKey, LockRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, including expired ones.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl LockStore for InMemoryStore {
    fn try_insert(
        &self,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> Result<InsertOutcome, StorageError> {
        match self.locks.entry(record.key.clone()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get();
                if existing.is_valid_at(now) && !existing.is_held_by(&record.holder) {
                    return Ok(InsertOutcome::Held(existing.clone()));
                }
                entry.insert(record.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(record.clone());
            }
        }
        Ok(InsertOutcome::Inserted)
    }

    fn get(&self, key: &LockKey) -> Result<Option<LockRecord>, StorageError> {
        Ok(self.locks.get(key).map(|entry| entry.value().clone()))
    }

    fn remove_if_token(
        &self,
        key: &LockKey,
        token: &LockToken,
    ) -> Result<Option<LockRecord>, StorageError> {
        Ok(self
            .locks
            .remove_if(key, |_, record| record.token == *token)
            .map(|(_, record)| record))
    }

    fn remove_held_by(&self, holder: &UserId) -> Result<Vec<LockKey>, StorageError> {
        let mut removed = Vec::new();
        self.locks.retain(|key, record| {
            let keep = !record.is_held_by(holder);
            if !keep {
                removed.push(key.clone());
            }
            keep
        });
        removed.sort();
        Ok(removed)
    }

    fn list(&self) -> Result<Vec<LockRecord>, StorageError> {
        let mut records: Vec<LockRecord> =
            self.locks.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<LockKey>, StorageError> {
        let mut purged = Vec::new();
        self.locks.retain(|key, record| {
            let keep = record.is_valid_at(now);
            if !keep {
                purged.push(key.clone());
            }
            keep
        });
        purged.sort();
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use chrono::Duration;
    use entlock_core::{lock_ttl, EntityId, EntityType};

    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn key(id: i64) -> LockKey {
        LockKey::new(EntityType::new("Report").unwrap(), EntityId(id))
    }

    fn record(id: i64, holder: UserId, at: DateTime<Utc>) -> LockRecord {
        LockRecord::new(key(id), holder, "editing", at, lock_ttl())
    }

    #[test]
    fn insert_into_vacant_key() {
        let store = InMemoryStore::new();
        let rec = record(1, UserId::new_v4(), t0());
        assert_eq!(store.try_insert(&rec, t0()).unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.get(&key(1)).unwrap(), Some(rec));
    }

    #[test]
    fn valid_foreign_lock_blocks_insert() {
        let store = InMemoryStore::new();
        let first = record(1, UserId::new_v4(), t0());
        store.try_insert(&first, t0()).unwrap();

        let second = record(1, UserId::new_v4(), t0());
        let outcome = store.try_insert(&second, t0() + Duration::seconds(10)).unwrap();
        assert_eq!(outcome, InsertOutcome::Held(first.clone()));
        assert_eq!(store.get(&key(1)).unwrap(), Some(first));
    }

    #[test]
    fn expired_lock_is_replaced() {
        let store = InMemoryStore::new();
        let first = record(1, UserId::new_v4(), t0());
        store.try_insert(&first, t0()).unwrap();

        let later = t0() + lock_ttl();
        let second = record(1, UserId::new_v4(), later);
        assert_eq!(store.try_insert(&second, later).unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.get(&key(1)).unwrap(), Some(second));
    }

    #[test]
    fn same_holder_replaces_own_lock() {
        let store = InMemoryStore::new();
        let user = UserId::new_v4();
        let first = record(1, user, t0());
        store.try_insert(&first, t0()).unwrap();

        let renewed = record(1, user, t0() + Duration::seconds(60));
        assert_eq!(
            store.try_insert(&renewed, t0() + Duration::seconds(60)).unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(store.get(&key(1)).unwrap().unwrap().token, renewed.token);
    }

    #[test]
    fn remove_requires_matching_token() {
        let store = InMemoryStore::new();
        let rec = record(1, UserId::new_v4(), t0());
        store.try_insert(&rec, t0()).unwrap();

        let wrong = LockToken::generate();
        assert_eq!(store.remove_if_token(&key(1), &wrong).unwrap(), None);
        assert!(store.get(&key(1)).unwrap().is_some());

        assert_eq!(store.remove_if_token(&key(1), &rec.token).unwrap(), Some(rec));
        assert!(store.is_empty());
    }

    #[test]
    fn remove_held_by_and_purge() {
        let store = InMemoryStore::new();
        let a = UserId::new_v4();
        let b = UserId::new_v4();
        store.try_insert(&record(1, a, t0()), t0()).unwrap();
        store.try_insert(&record(2, a, t0()), t0()).unwrap();
        store
            .try_insert(&record(3, b, t0() + Duration::seconds(100)), t0())
            .unwrap();

        assert_eq!(store.remove_held_by(&a).unwrap(), vec![key(1), key(2)]);
        assert_eq!(store.len(), 1);

        assert!(store.purge_expired(t0() + lock_ttl()).unwrap().is_empty());
        assert_eq!(
            store
                .purge_expired(t0() + lock_ttl() + Duration::seconds(100))
                .unwrap(),
            vec![key(3)]
        );
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn concurrent_inserts_grant_exactly_one() {
        let store = Arc::new(InMemoryStore::new());
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let rec = record(7, UserId::new_v4(), t0());
                    barrier.wait();
                    store.try_insert(&rec, t0()).unwrap()
                })
            })
            .collect();

        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| *o == InsertOutcome::Inserted)
            .count();
        assert_eq!(inserted, 1);
    }
}
