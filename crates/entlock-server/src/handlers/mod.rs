//! HTTP handler modules for the entlock API.
//!
//! Each sub-module implements thin handlers that parse requests, delegate to
//! [`LockManager`](crate::concurrency::LockManager) or
//! [`UserRegistry`](crate::concurrency::UserRegistry), and return JSON
//! responses. No locking policy lives in handlers.

pub mod locks;
pub mod users;
