//! Application state shared by all handlers.
//!
//! [`AppState`] holds the [`LockManager`] and [`UserRegistry`] behind `Arc`s.
//! Neither needs an outer mutex: atomicity of lock acquisition is provided by
//! the [`LockStore`] backend and the registry is a `DashMap`.

use std::sync::Arc;

use entlock_core::{Clock, SystemClock};
use entlock_storage::{InMemoryStore, LockStore, SqliteStore};

use crate::concurrency::{LockManager, UserRegistry};
use crate::config::ServerConfig;
use crate::error::ApiError;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Per-entity edit lock manager.
    pub lock_manager: Arc<LockManager>,
    /// Registered users.
    pub users: Arc<UserRegistry>,
}

impl AppState {
    /// Creates an `AppState` from configuration, using the SQLite backend
    /// when a database path is set.
    ///
    /// Starts the expiry sweep task when configured, so it must be called
    /// from within a tokio runtime in that case.
    pub fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        let store: Arc<dyn LockStore> = match &config.db_path {
            Some(path) => {
                tracing::info!(path = %path, "using SQLite lock store");
                Arc::new(SqliteStore::new(path)?)
            }
            None => {
                tracing::info!("using in-memory lock store");
                Arc::new(InMemoryStore::new())
            }
        };

        let state = Self::with_parts(store, Arc::new(SystemClock));
        if let Some(interval) = config.sweep_interval {
            tracing::info!(interval_secs = interval.as_secs(), "starting lock expiry sweep");
            state.lock_manager.start_expiry_sweep(interval);
        }
        Ok(state)
    }

    /// Creates an `AppState` with an in-memory store (for testing).
    pub fn in_memory() -> Self {
        Self::with_parts(Arc::new(InMemoryStore::new()), Arc::new(SystemClock))
    }

    /// Wires the state from an explicit store and clock.
    pub fn with_parts(store: Arc<dyn LockStore>, clock: Arc<dyn Clock>) -> Self {
        AppState {
            lock_manager: Arc::new(LockManager::with_default_ttl(store, clock.clone())),
            users: Arc::new(UserRegistry::new(clock)),
        }
    }
}
