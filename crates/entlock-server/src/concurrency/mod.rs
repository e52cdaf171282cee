//! Collaborative-editing concurrency infrastructure.
//!
//! - [`user::UserRegistry`] for user sessions
//! - [`lock_manager::LockManager`] for per-entity edit locks

pub mod lock_manager;
pub mod user;

pub use lock_manager::{LockError, LockManager};
pub use user::{UserRegistry, UserSession};

use entlock_core::UserId;
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the caller's user ID.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Extracts the user ID from the `X-User-Id` HTTP header.
///
/// Returns `ApiError::UserRequired` if the header is missing or malformed.
pub fn extract_user_id(headers: &axum::http::HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .map(UserId)
        .ok_or_else(|| ApiError::UserRequired(format!("{} header required", USER_ID_HEADER)))
}
