//! SQLite implementation of [`LockStore`].
//!
//! [`SqliteStore`] persists the lock table in a SQLite database with WAL mode
//! and automatic schema migrations. The connection sits behind a mutex, and
//! every write runs in an `IMMEDIATE` transaction, so the check and the
//! write of [`LockStore::try_insert`] also hold against other processes that
//! open the same file. Timestamps are stored as epoch milliseconds.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use entlock_core::{EntityId, EntityType, LockKey, LockRecord, LockToken, UserId};

use crate::error::StorageError;
use crate::traits::{InsertOutcome, LockStore};

const SELECT_COLUMNS: &str =
    "entity_type, entity_id, token, holder, info, created_at_ms, expires_at_ms";

/// SQLite-backed implementation of [`LockStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// A row as stored, before domain validation.
struct RawLockRow {
    entity_type: String,
    entity_id: i64,
    token: String,
    holder: String,
    info: String,
    created_at_ms: i64,
    expires_at_ms: i64,
}

impl RawLockRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawLockRow {
            entity_type: row.get(0)?,
            entity_id: row.get(1)?,
            token: row.get(2)?,
            holder: row.get(3)?,
            info: row.get(4)?,
            created_at_ms: row.get(5)?,
            expires_at_ms: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<LockRecord, StorageError> {
        let holder = Uuid::parse_str(&self.holder).map_err(|e| StorageError::Corrupt {
            reason: format!("holder '{}': {}", self.holder, e),
        })?;
        Ok(LockRecord {
            key: LockKey::new(EntityType::new(self.entity_type)?, EntityId(self.entity_id)),
            token: LockToken::parse(self.token)?,
            holder: UserId(holder),
            info: self.info,
            created_at: millis_to_datetime(self.created_at_ms)?,
            expires_at: millis_to_datetime(self.expires_at_ms)?,
        })
    }
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| StorageError::Corrupt {
        reason: format!("timestamp out of range: {}", ms),
    })
}

fn select_by_key(conn: &Connection, key: &LockKey) -> Result<Option<LockRecord>, StorageError> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {} FROM entity_locks WHERE entity_type = ?1 AND entity_id = ?2",
                SELECT_COLUMNS
            ),
            params![key.entity_type.as_str(), key.entity_id.0],
            RawLockRow::from_row,
        )
        .optional()?;
    raw.map(RawLockRow::into_record).transpose()
}

fn select_where(
    conn: &Connection,
    clause: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<LockRecord>, StorageError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM entity_locks {} ORDER BY entity_type, entity_id",
        SELECT_COLUMNS, clause
    ))?;
    let rows = stmt.query_map(args, RawLockRow::from_row)?;
    let mut records = Vec::new();
    for raw in rows {
        records.push(raw?.into_record()?);
    }
    Ok(records)
}

/// Keys of the matching rows. Reads only the key columns, so rows that would
/// fail to decode do not block deleting them.
fn select_keys_where(
    conn: &Connection,
    clause: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<LockKey>, StorageError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT entity_type, entity_id FROM entity_locks {} ORDER BY entity_type, entity_id",
        clause
    ))?;
    let rows = stmt.query_map(args, |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    let mut keys = Vec::new();
    for row in rows {
        let (entity_type, entity_id) = row?;
        keys.push(LockKey::new(EntityType::new(entity_type)?, EntityId(entity_id)));
    }
    Ok(keys)
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Opens the SQLite database at `path`, failing if it does not exist.
    pub fn open_existing(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_existing_database(path)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl LockStore for SqliteStore {
    fn try_insert(
        &self,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> Result<InsertOutcome, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(existing) = select_by_key(&tx, &record.key)? {
            if existing.is_valid_at(now) && !existing.is_held_by(&record.holder) {
                return Ok(InsertOutcome::Held(existing));
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO entity_locks
                 (entity_type, entity_id, token, holder, info, created_at_ms, expires_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.key.entity_type.as_str(),
                record.key.entity_id.0,
                record.token.as_str(),
                record.holder.0.to_string(),
                record.info,
                record.created_at.timestamp_millis(),
                record.expires_at.timestamp_millis(),
            ],
        )?;
        tx.commit()?;
        Ok(InsertOutcome::Inserted)
    }

    fn get(&self, key: &LockKey) -> Result<Option<LockRecord>, StorageError> {
        let conn = self.conn()?;
        select_by_key(&conn, key)
    }

    fn remove_if_token(
        &self,
        key: &LockKey,
        token: &LockToken,
    ) -> Result<Option<LockRecord>, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = match select_by_key(&tx, key)? {
            Some(existing) if existing.token == *token => existing,
            _ => return Ok(None),
        };

        tx.execute(
            "DELETE FROM entity_locks WHERE entity_type = ?1 AND entity_id = ?2 AND token = ?3",
            params![key.entity_type.as_str(), key.entity_id.0, token.as_str()],
        )?;
        tx.commit()?;
        Ok(Some(existing))
    }

    fn remove_held_by(&self, holder: &UserId) -> Result<Vec<LockKey>, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let holder_str = holder.0.to_string();
        let keys = select_keys_where(&tx, "WHERE holder = ?1", params![holder_str])?;

        tx.execute("DELETE FROM entity_locks WHERE holder = ?1", params![holder_str])?;
        tx.commit()?;
        Ok(keys)
    }

    fn list(&self) -> Result<Vec<LockRecord>, StorageError> {
        let conn = self.conn()?;
        select_where(&conn, "", [])
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<LockKey>, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let now_ms = now.timestamp_millis();
        let keys = select_keys_where(&tx, "WHERE expires_at_ms <= ?1", params![now_ms])?;

        tx.execute(
            "DELETE FROM entity_locks WHERE expires_at_ms <= ?1",
            params![now_ms],
        )?;
        tx.commit()?;
        Ok(keys)
    }
}
