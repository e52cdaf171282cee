//! User session management for collaborative editing.
//!
//! [`UserRegistry`] tracks connected users via UUID-based identifiers.
//! Users register to receive a [`UserId`], which is required for lock
//! acquisition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use entlock_core::{Clock, UserId};

/// A registered user with metadata.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub id: UserId,
    /// Optional human-readable display name.
    pub name: Option<String>,
    pub registered_at: DateTime<Utc>,
    /// When the user last performed a lock operation.
    pub last_active: DateTime<Utc>,
}

/// Registry of active users.
///
/// Backed by `DashMap` for concurrent access from multiple async handler
/// tasks.
pub struct UserRegistry {
    sessions: DashMap<UserId, UserSession>,
    clock: Arc<dyn Clock>,
}

impl UserRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        UserRegistry {
            sessions: DashMap::new(),
            clock,
        }
    }

    /// Registers a new user, returning the created session.
    pub fn register(&self, name: Option<String>) -> UserSession {
        let now = self.clock.now();
        let session = UserSession {
            id: UserId::new_v4(),
            name,
            registered_at: now,
            last_active: now,
        };
        self.sessions.insert(session.id, session.clone());
        tracing::info!(user = %session.id, name = ?session.name, "user registered");
        session
    }

    /// Removes a user session. Returns `true` if the user was registered.
    pub fn deregister(&self, id: &UserId) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Returns a clone of the user session, if it exists.
    pub fn get(&self, id: &UserId) -> Option<UserSession> {
        self.sessions.get(id).map(|entry| entry.clone())
    }

    /// Runs `f` while holding the user's entry, or returns `None` if the user
    /// is not registered. A concurrent [`deregister`](Self::deregister) of the
    /// same user waits until `f` returns. `f` must not call back into the
    /// registry.
    pub fn while_registered<T>(&self, id: &UserId, f: impl FnOnce() -> T) -> Option<T> {
        let _entry = self.sessions.get(id)?;
        Some(f())
    }

    /// Returns all registered users.
    pub fn list(&self) -> Vec<UserSession> {
        self.sessions.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Updates the `last_active` timestamp for a user.
    pub fn touch(&self, id: &UserId) {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            entry.last_active = self.clock.now();
        }
    }
}
