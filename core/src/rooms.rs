//! Room membership tracking.
//!
//! Provides the room index: a many-to-many membership table between
//! connection ids and room names. A room has no identity beyond its name;
//! a room with zero members simply does not exist.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::connection::ConnectionId;

#[derive(Debug, Default)]
struct RoomsInner {
    /// Room name to member connection ids.
    members: HashMap<String, HashSet<ConnectionId>>,

    /// Connection id to joined room names.
    joined: HashMap<ConnectionId, HashSet<String>>,
}

/// Membership table between connections and named rooms.
///
/// Both directions of the relation live under one lock, so the forward and
/// reverse entries can never disagree.
#[derive(Debug, Default)]
pub struct RoomIndex {
    inner: RwLock<RoomsInner>,
}

impl RoomIndex {
    /// Creates an empty room index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a room. Joining twice is idempotent.
    pub async fn join(&self, id: ConnectionId, room: impl Into<String>) {
        let room = room.into();
        let mut inner = self.inner.write().await;
        inner.members.entry(room.clone()).or_default().insert(id);
        inner.joined.entry(id).or_default().insert(room);
    }

    /// Removes a connection from a room. Leaving a room not joined is a no-op.
    pub async fn leave(&self, id: ConnectionId, room: &str) {
        let mut inner = self.inner.write().await;

        if let Some(members) = inner.members.get_mut(room) {
            members.remove(&id);
            if members.is_empty() {
                inner.members.remove(room);
            }
        }

        if let Some(rooms) = inner.joined.get_mut(&id) {
            rooms.remove(room);
            if rooms.is_empty() {
                inner.joined.remove(&id);
            }
        }
    }

    /// Removes a connection from every room, returning the rooms it left.
    pub async fn leave_all(&self, id: ConnectionId) -> Vec<String> {
        let mut inner = self.inner.write().await;

        let Some(rooms) = inner.joined.remove(&id) else {
            return Vec::new();
        };

        for room in &rooms {
            if let Some(members) = inner.members.get_mut(room) {
                members.remove(&id);
                if members.is_empty() {
                    inner.members.remove(room);
                }
            }
        }

        rooms.into_iter().collect()
    }

    /// Returns a snapshot of a room's members; empty if the room has none.
    pub async fn members(&self, room: &str) -> Vec<ConnectionId> {
        let inner = self.inner.read().await;
        inner
            .members
            .get(room)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns a snapshot of the rooms a connection has joined.
    pub async fn rooms_of(&self, id: ConnectionId) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .joined
            .get(&id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of rooms with at least one member.
    pub async fn room_count(&self) -> usize {
        self.inner.read().await.members.len()
    }

    /// Removes every membership. Used during shutdown.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.members.clear();
        inner.joined.clear();
    }
}
