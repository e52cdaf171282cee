//! Core error types for entlock-core.
//!
//! Uses `thiserror` for structured, matchable error variants.

use thiserror::Error;

/// Core errors produced by the entlock-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An entity type tag failed validation.
    #[error("invalid entity type '{tag}': {reason}")]
    InvalidEntityType { tag: String, reason: String },

    /// A lock token was empty or malformed.
    #[error("invalid lock token: {reason}")]
    InvalidToken { reason: String },
}
