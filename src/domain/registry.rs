//! Concurrent membership set of live connections.
//!
//! [`ConnectionRegistry`] maps [`ConnectionId`] to a shared
//! [`ConnectionHandle`] behind a single `std::sync::RwLock`. Every
//! operation holds the lock only long enough to touch the map, so the
//! broadcaster copies membership out with [`ConnectionRegistry::snapshot`]
//! and delivers without holding it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{ConnectionHandle, ConnectionId};

/// Authoritative set of currently registered connections.
///
/// # Concurrency
///
/// - `add`, `remove` and `snapshot` are mutually exclusive, so a snapshot
///   sees each membership change either completely or not at all.
/// - No lock is held across an `.await` or during delivery.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    members: RwLock<HashMap<ConnectionId, Arc<ConnectionHandle>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly accepted connection.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        let id = handle.id();
        let previous = self.write().insert(id, handle);
        if previous.is_some() {
            tracing::warn!(conn_id = %id, "connection registered twice; keeping latest handle");
        }
    }

    /// Deregisters a connection.
    ///
    /// Returns `true` if the connection was a member. Removing an unknown or
    /// already-removed id is a no-op.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.write().remove(&id).is_some()
    }

    /// Returns a point-in-time copy of the current members.
    ///
    /// The returned vector is independent of the registry: later `add` and
    /// `remove` calls do not affect it.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<ConnectionHandle>> {
        self.read().values().map(Arc::clone).collect()
    }

    /// Returns `true` if the connection is currently registered.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.read().contains_key(&id)
    }

    /// Returns the number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated, so
    // poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ConnectionId, Arc<ConnectionHandle>>> {
        self.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ConnectionId, Arc<ConnectionHandle>>> {
        self.members.write().unwrap_or_else(PoisonError::into_inner)
    }
}
