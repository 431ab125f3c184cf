//! Registry of live connections.
//!
//! One exclusive lock guards the member map. Every operation holds it
//! only for the map access itself; callers that need to do I/O against
//! the members take a [`Registry::snapshot`] and work on the copy.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

use crate::connection::{Connection, ConnectionId};

/// The set of connections currently believed alive.
#[derive(Default)]
pub struct Registry {
    members: Mutex<HashMap<ConnectionId, Connection>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `conn`. Adding a connection that is already present keeps
    /// a single entry.
    pub async fn add(&self, conn: Connection) {
        let id = conn.id();
        let total = {
            let mut guard = self.members.lock().await;
            guard.insert(id, conn);
            guard.len()
        };
        debug!(conn = %id, total, "connection registered");
    }

    /// Remove `conn` if present. Returns `false` (and does nothing) when
    /// it was not a member, so cleanup can run from several failure sites.
    pub async fn remove(&self, conn: &Connection) -> bool {
        let id = conn.id();
        let (removed, total) = {
            let mut guard = self.members.lock().await;
            let removed = guard.remove(&id).is_some();
            (removed, guard.len())
        };
        if removed {
            debug!(conn = %id, total, "connection unregistered");
        }
        removed
    }

    /// Copy of the current members. The lock is released on return.
    pub async fn snapshot(&self) -> Vec<Connection> {
        let guard = self.members.lock().await;
        guard.values().cloned().collect()
    }

    pub async fn contains(&self, conn: &Connection) -> bool {
        self.members.lock().await.contains_key(&conn.id())
    }

    pub async fn len(&self) -> usize {
        self.members.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.lock().await.is_empty()
    }
}
