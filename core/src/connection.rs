//! Connection tracking.
//!
//! Provides the connection registry: the canonical set of live connections,
//! keyed by connection id and indexed by owning user id.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::transport::Transport;

/// Opaque identifier for one registered connection.
///
/// Ids are issued per registry and never reused while the registry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One registered client connection.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique connection id.
    pub id: ConnectionId,

    /// Owning user id; a user may own many connections.
    pub user_id: String,

    /// Handle to the underlying socket, owned by the transport layer.
    pub transport: Arc<dyn Transport>,

    /// Registration time.
    pub connected_at: Instant,
}

#[derive(Debug, Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, Connection>,
    by_user: HashMap<String, HashSet<ConnectionId>>,
}

/// Registry of all live connections.
///
/// The connection map and the per-user index are mutated under one lock so
/// no reader can observe a half-removed connection.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh id without registering anything.
    ///
    /// Used when a registration must be refused (manager already closed)
    /// but the caller is still owed a distinct id.
    pub fn issue_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Registers a connection and returns its fresh id.
    ///
    /// Never fails; repeated registrations for the same user receive
    /// distinct ids.
    pub async fn add(&self, user_id: impl Into<String>, transport: Arc<dyn Transport>) -> ConnectionId {
        let id = self.issue_id();
        let user_id = user_id.into();

        let connection = Connection {
            id,
            user_id: user_id.clone(),
            transport,
            connected_at: Instant::now(),
        };

        let mut inner = self.inner.write().await;
        inner.connections.insert(id, connection);
        inner.by_user.entry(user_id).or_default().insert(id);

        id
    }

    /// Removes a connection, returning its owner when it existed.
    ///
    /// Unknown ids are a no-op.
    pub async fn remove(&self, id: ConnectionId) -> Option<Connection> {
        let mut inner = self.inner.write().await;
        let connection = inner.connections.remove(&id)?;

        if let Some(ids) = inner.by_user.get_mut(&connection.user_id) {
            ids.remove(&id);
            if ids.is_empty() {
                inner.by_user.remove(&connection.user_id);
            }
        }

        Some(connection)
    }

    /// Returns a snapshot of the connection ids owned by a user.
    pub async fn clients_by_user(&self, user_id: &str) -> Vec<ConnectionId> {
        let inner = self.inner.read().await;
        inner
            .by_user
            .get(user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the number of live connections.
    pub async fn client_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Returns true if the id is currently registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.inner.read().await.connections.contains_key(&id)
    }

    /// Returns the transport handle for a connection, if registered.
    pub async fn transport(&self, id: ConnectionId) -> Option<Arc<dyn Transport>> {
        let inner = self.inner.read().await;
        inner
            .connections
            .get(&id)
            .map(|c| Arc::clone(&c.transport))
    }

    /// Returns a snapshot of every registered connection id.
    pub async fn all_ids(&self) -> Vec<ConnectionId> {
        let inner = self.inner.read().await;
        inner.connections.keys().copied().collect()
    }

    /// Removes and returns every connection. Used during shutdown.
    pub async fn drain(&self) -> Vec<Connection> {
        let mut inner = self.inner.write().await;
        inner.by_user.clear();
        inner.connections.drain().map(|(_, c)| c).collect()
    }
}
