//! Connection liveness tracking.
//!
//! Records a last-seen timestamp per connection and classifies liveness
//! against a configurable staleness threshold. Liveness is tracked here
//! rather than at the socket so the manager behaves the same across
//! transports that do not expose protocol-level keep-alive.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::connection::ConnectionId;

/// Tracks last-seen timestamps and classifies stale connections.
///
/// Staleness is a derived, point-in-time judgment: [`HeartbeatTracker::is_alive`]
/// never removes anything. A periodic sweep decides what to do with stale ids.
#[derive(Debug)]
pub struct HeartbeatTracker {
    last_seen: RwLock<HashMap<ConnectionId, Instant>>,
    stale_after: Duration,
}

impl HeartbeatTracker {
    /// Creates a tracker with the given staleness threshold.
    #[must_use]
    pub fn new(stale_after: Duration) -> Self {
        Self {
            last_seen: RwLock::new(HashMap::new()),
            stale_after,
        }
    }

    /// Returns the configured staleness threshold.
    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Records a liveness signal for a connection.
    pub async fn touch(&self, id: ConnectionId) {
        self.last_seen.write().await.insert(id, Instant::now());
    }

    /// Returns true if the connection is tracked and within the threshold.
    ///
    /// Unknown ids are reported dead.
    pub async fn is_alive(&self, id: ConnectionId) -> bool {
        let last_seen = self.last_seen.read().await;
        last_seen
            .get(&id)
            .is_some_and(|seen| seen.elapsed() < self.stale_after)
    }

    /// Stops tracking a connection.
    pub async fn remove(&self, id: ConnectionId) {
        self.last_seen.write().await.remove(&id);
    }

    /// Returns the ids whose last signal is older than the threshold.
    pub async fn stale_ids(&self) -> Vec<ConnectionId> {
        let last_seen = self.last_seen.read().await;
        last_seen
            .iter()
            .filter(|(_, seen)| seen.elapsed() >= self.stale_after)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Number of tracked connections.
    pub async fn tracked_count(&self) -> usize {
        self.last_seen.read().await.len()
    }

    /// Forgets every tracked connection. Used during shutdown.
    pub async fn clear(&self) {
        self.last_seen.write().await.clear();
    }
}
