//! Registry of live client connections
//!
//! All membership changes and every broadcast pass go through one
//! `tokio::sync::Mutex`. A pass holds the lock across its writes, so writes
//! to a single connection are serialized and a connection removed from the
//! registry is never written to again.

use crate::connection::{Connection, ConnectionId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard};

/// Membership set guarded by the registry lock
#[derive(Default)]
pub struct Members {
    conns: HashMap<ConnectionId, Box<dyn Connection>>,
}

impl Members {
    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.conns.len()
    }

    /// Whether no connection is registered
    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.conns.contains_key(&id)
    }

    /// Snapshot of registered ids, in ascending order
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.conns.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Mutable access to one connection
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Box<dyn Connection>> {
        self.conns.get_mut(&id)
    }

    /// Remove a connection, handing it back to the caller
    pub fn remove(&mut self, id: ConnectionId) -> Option<Box<dyn Connection>> {
        self.conns.remove(&id)
    }
}

/// Shared set of currently open connections
///
/// Construct one at startup and share it through an `Arc` with both the
/// connection handler and the notification intake.
#[derive(Default)]
pub struct Registry {
    members: Mutex<Members>,
    next_id: AtomicU64,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a newly accepted connection
    ///
    /// Every later broadcast pass includes it until it is deregistered.
    pub async fn register(&self, conn: Box<dyn Connection>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.members.lock().await.conns.insert(id, conn);
        id
    }

    /// Remove a connection and release it
    ///
    /// Idempotent: returns `false` when `id` is not registered. The
    /// connection is closed after the lock has been released.
    pub async fn deregister(&self, id: ConnectionId) -> bool {
        let removed = self.members.lock().await.remove(id);

        match removed {
            Some(mut conn) => {
                conn.close().await;
                true
            }
            None => false,
        }
    }

    /// Acquire exclusive access for a full pass over the membership
    ///
    /// No other task can register or deregister while the guard is held.
    /// Removals made through the guard take effect immediately.
    pub async fn lock(&self) -> MutexGuard<'_, Members> {
        self.members.lock().await
    }

    /// Number of registered connections
    pub async fn len(&self) -> usize {
        self.members.lock().await.len()
    }

    /// Whether no connection is registered
    pub async fn is_empty(&self) -> bool {
        self.members.lock().await.is_empty()
    }

    /// Whether `id` is registered
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.members.lock().await.contains(id)
    }
}
