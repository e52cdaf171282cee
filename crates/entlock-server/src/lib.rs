//! HTTP/JSON lock service for collaborative entity editing.
//!
//! Users register, then take exclusive edit locks on entities identified by
//! `(entity type, id)`. A lock is proven by its token and expires a fixed
//! TTL after it was granted. This crate contains the lock manager, the user
//! registry, the API schema types, error handling, configuration, and route
//! definitions.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod schema;
pub mod state;
