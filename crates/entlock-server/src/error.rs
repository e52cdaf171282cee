//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the unified error type for all API endpoints. It implements
//! `axum::response::IntoResponse` to produce structured JSON error responses
//! with appropriate HTTP status codes.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use entlock_core::LockInfo;

use crate::concurrency::LockError;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "LOCK_CONFLICT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional structured details (e.g., the current lock holder).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API errors with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Entity not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or unknown `X-User-Id` (401).
    #[error("user required: {0}")]
    UserRequired(String),

    /// Another user holds a valid lock (409).
    #[error("lock conflict: {message}")]
    LockConflict { message: String, holder: LockInfo },

    /// The presented token's lock has expired (410).
    #[error("lock expired: {0}")]
    LockExpired(String),

    /// The presented token does not match the holder (403).
    #[error("lock mismatch: {0}")]
    LockMismatch(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::UserRequired(_) => (StatusCode::UNAUTHORIZED, "USER_REQUIRED"),
            ApiError::LockConflict { .. } => (StatusCode::CONFLICT, "LOCK_CONFLICT"),
            ApiError::LockExpired(_) => (StatusCode::GONE, "LOCK_EXPIRED"),
            ApiError::LockMismatch(_) => (StatusCode::FORBIDDEN, "LOCK_MISMATCH"),
            ApiError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let (message, details) = match self {
            ApiError::LockConflict { message, holder } => {
                (message, serde_json::to_value(holder).ok())
            }
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::UserRequired(msg)
            | ApiError::LockExpired(msg)
            | ApiError::LockMismatch(msg)
            | ApiError::InternalError(msg) => (msg, None),
        };

        let detail = ApiErrorDetail {
            code: code.to_string(),
            message,
            details,
        };
        let body = serde_json::json!({
            "success": false,
            "error": detail,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<LockError> for ApiError {
    fn from(err: LockError) -> Self {
        let message = err.to_string();
        match err {
            LockError::Conflict(holder) => ApiError::LockConflict { message, holder },
            LockError::Expired { .. } => ApiError::LockExpired(message),
            LockError::Mismatch { .. } => ApiError::LockMismatch(message),
            LockError::Storage(_) => ApiError::InternalError(message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<entlock_core::CoreError> for ApiError {
    fn from(err: entlock_core::CoreError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<entlock_storage::StorageError> for ApiError {
    fn from(err: entlock_storage::StorageError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use entlock_core::{EntityId, EntityType, LockKey, UserId};

    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(0, 0).unwrap()
    }

    fn key() -> LockKey {
        LockKey::new(EntityType::new("Report").unwrap(), EntityId(42))
    }

    #[test]
    fn lock_errors_map_to_distinct_statuses() {
        let holder = LockInfo {
            entity_type: EntityType::new("Report").unwrap(),
            entity_id: EntityId(42),
            info: "editing".to_string(),
            holder: UserId::new_v4(),
            expires_at: epoch(),
        };
        let cases = [
            (LockError::Conflict(holder), StatusCode::CONFLICT),
            (
                LockError::Expired {
                    key: key(),
                    expired_at: epoch(),
                },
                StatusCode::GONE,
            ),
            (LockError::Mismatch { key: key() }, StatusCode::FORBIDDEN),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
