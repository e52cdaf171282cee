//! Schema types for user registration API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use entlock_core::LockKey;

use crate::concurrency::UserSession;

/// Request to register a new user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterUserRequest {
    /// Optional human-readable user name.
    #[serde(default)]
    pub name: Option<String>,
}

/// View of a registered user.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl From<UserSession> for UserView {
    fn from(session: UserSession) -> Self {
        UserView {
            user_id: session.id.0,
            name: session.name,
            registered_at: session.registered_at,
            last_active: session.last_active,
        }
    }
}

/// Response listing all registered users.
#[derive(Debug, Clone, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserView>,
}

/// Response after deregistering a user.
#[derive(Debug, Clone, Serialize)]
pub struct DeregisterUserResponse {
    pub success: bool,
    /// Locks that were held by the user and are now released.
    pub released_locks: Vec<LockKey>,
}
