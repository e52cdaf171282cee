//! Schema types for the lock management API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use entlock_core::{LockInfo, LockRecord};

/// Request to lock one entity.
#[derive(Debug, Clone, Deserialize)]
pub struct AcquireLockRequest {
    pub entity_type: String,
    pub entity_id: i64,
    /// Why the lock is being taken.
    #[serde(default)]
    pub info: Option<String>,
}

/// A granted lock. The only response that ever carries the token.
#[derive(Debug, Clone, Serialize)]
pub struct AcquireLockResponse {
    pub token: String,
    pub entity_type: String,
    pub entity_id: i64,
    pub info: String,
    pub holder: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<LockRecord> for AcquireLockResponse {
    fn from(record: LockRecord) -> Self {
        AcquireLockResponse {
            token: record.token.as_str().to_string(),
            entity_type: record.key.entity_type.to_string(),
            entity_id: record.key.entity_id.0,
            info: record.info,
            holder: record.holder.0,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}

/// Body of validate and release requests.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Response to a successful validation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateLockResponse {
    pub valid: bool,
    pub lock: LockInfo,
}

/// Response after releasing a lock.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseLockResponse {
    pub released: bool,
    pub entity_type: String,
    pub entity_id: i64,
}

/// Lock status of one entity.
#[derive(Debug, Clone, Serialize)]
pub struct DescribeLockResponse {
    pub locked: bool,
    pub lock: Option<LockInfo>,
}

/// All currently valid locks.
#[derive(Debug, Clone, Serialize)]
pub struct ListLocksResponse {
    pub locks: Vec<LockInfo>,
}
