//! Property tests: the lock manager agrees with a simple reference model
//! and never reports two valid locks for the same entity.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use entlock_core::{lock_ttl, EntityId, EntityType, LockToken, ManualClock, UserId};
use entlock_server::concurrency::{LockError, LockManager};
use entlock_storage::{InMemoryStore, LockStore, SqliteStore};

#[derive(Debug, Clone)]
enum Op {
    Acquire { user: usize, key: i64 },
    Validate { user: usize, key: i64 },
    Release { user: usize, key: i64 },
    Advance(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..3usize, 0..3i64).prop_map(|(user, key)| Op::Acquire { user, key }),
        2 => (0..3usize, 0..3i64).prop_map(|(user, key)| Op::Validate { user, key }),
        1 => (0..3usize, 0..3i64).prop_map(|(user, key)| Op::Release { user, key }),
        2 => (0i64..5000).prop_map(Op::Advance),
    ]
}

struct Held {
    user: usize,
    token: LockToken,
    expires_at: DateTime<Utc>,
}

fn run_against(store: Arc<dyn LockStore>, ops: &[Op]) -> Result<(), TestCaseError> {
    let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let clock = Arc::new(ManualClock::new(t0));
    let manager = LockManager::with_default_ttl(store, clock.clone());
    let users: Vec<UserId> = (0..3).map(|_| UserId::new_v4()).collect();
    let tag = EntityType::new("Report").unwrap();

    let mut now = t0;
    let mut held: HashMap<i64, Held> = HashMap::new();
    let mut tokens: HashMap<(usize, i64), LockToken> = HashMap::new();

    for op in ops {
        match op.clone() {
            Op::Advance(secs) => {
                now += Duration::seconds(secs);
                clock.set(now);
            }
            Op::Acquire { user, key } => {
                let blocked = held
                    .get(&key)
                    .is_some_and(|h| now < h.expires_at && h.user != user);
                let result = manager.acquire(&tag, EntityId(key), users[user], "edit");
                if blocked {
                    let conflicted = matches!(result, Err(LockError::Conflict(_)));
                    prop_assert!(conflicted, "expected Conflict, got {:?}", result);
                } else {
                    let record = result.map_err(|e| TestCaseError::fail(e.to_string()))?;
                    prop_assert_eq!(record.expires_at, now + lock_ttl());
                    tokens.insert((user, key), record.token.clone());
                    held.insert(
                        key,
                        Held {
                            user,
                            token: record.token,
                            expires_at: record.expires_at,
                        },
                    );
                }
            }
            Op::Validate { user, key } => {
                let token = tokens
                    .get(&(user, key))
                    .cloned()
                    .unwrap_or_else(LockToken::generate);
                let result = manager.validate(&token, &tag, EntityId(key));
                match held.get(&key) {
                    Some(h) if h.token == token && now >= h.expires_at => {
                        let expired = matches!(result, Err(LockError::Expired { .. }));
                        prop_assert!(expired, "expected Expired, got {:?}", result);
                    }
                    Some(h) if h.token == token => {
                        prop_assert!(result.is_ok());
                    }
                    _ => {
                        let mismatched = matches!(result, Err(LockError::Mismatch { .. }));
                        prop_assert!(mismatched, "expected Mismatch, got {:?}", result);
                    }
                }
            }
            Op::Release { user, key } => {
                let token = tokens
                    .get(&(user, key))
                    .cloned()
                    .unwrap_or_else(LockToken::generate);
                let result = manager.release(&token, &tag, EntityId(key));
                if held.get(&key).is_some_and(|h| h.token == token) {
                    prop_assert!(result.is_ok());
                    held.remove(&key);
                } else {
                    let mismatched = matches!(result, Err(LockError::Mismatch { .. }));
                    prop_assert!(mismatched, "expected Mismatch, got {:?}", result);
                }
            }
        }

        let active = manager
            .list_active()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let keys: HashSet<i64> = active.iter().map(|info| info.entity_id.0).collect();
        prop_assert_eq!(keys.len(), active.len(), "duplicate valid lock");

        let expected: HashSet<i64> = held
            .iter()
            .filter(|(_, h)| now < h.expires_at)
            .map(|(key, _)| *key)
            .collect();
        prop_assert_eq!(keys, expected);
    }
    Ok(())
}

proptest! {
    #[test]
    fn in_memory_store_matches_model(ops in proptest::collection::vec(op(), 1..60)) {
        run_against(Arc::new(InMemoryStore::new()), &ops)?;
    }

    #[test]
    fn sqlite_store_matches_model(ops in proptest::collection::vec(op(), 1..60)) {
        run_against(Arc::new(SqliteStore::in_memory().unwrap()), &ops)?;
    }
}
