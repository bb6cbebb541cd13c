//! The realtime manager.
//!
//! Ties the connection registry, room index, heartbeat tracker, and event
//! hooks together behind one facade and performs best-effort, failure-
//! isolated message dispatch. Every public operation is total: unknown ids
//! mean "no matching recipients", delivery failures are surfaced through the
//! error hook and metrics, and nothing raises to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::{ConfigError, ManagerConfig};
use super::connection::{ConnectionId, ConnectionRegistry};
use super::events::{Event, EventHooks, EventKind};
use super::heartbeat::HeartbeatTracker;
use super::messages::{Message, MessageType};
use super::metrics::RelayMetrics;
use super::rooms::RoomIndex;
use super::transport::Transport;

/// Point-in-time manager statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerStats {
    /// Live connections.
    pub connected_clients: usize,

    /// Rooms with at least one member.
    pub total_rooms: usize,
}

/// Real-time connection and room broadcast manager.
///
/// Owns all connection state for one manager instance; independent
/// instances share nothing, so several can coexist in one process.
#[derive(Debug)]
pub struct RealtimeManager {
    registry: ConnectionRegistry,
    rooms: RoomIndex,
    heartbeats: HeartbeatTracker,
    hooks: EventHooks,
    metrics: Arc<RelayMetrics>,
    config: ManagerConfig,
    closed: AtomicBool,
}

impl Default for RealtimeManager {
    fn default() -> Self {
        Self::with_config_unchecked(ManagerConfig::default())
    }
}

impl RealtimeManager {
    /// Creates a manager with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ManagerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config_unchecked(config))
    }

    fn with_config_unchecked(config: ManagerConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomIndex::new(),
            heartbeats: HeartbeatTracker::new(config.stale_after),
            hooks: EventHooks::new(),
            metrics: Arc::new(RelayMetrics::new()),
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the manager configuration.
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Returns the manager metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Returns true once `close()` has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn emit(&self, event: &Event) {
        let panicked = self.hooks.fire(event);
        self.metrics.record_hook_panics(panicked as u64);
    }

    // ---- connection registry ------------------------------------------------

    /// Registers a connection and returns its fresh id.
    ///
    /// Never fails; a user may hold any number of connections. After
    /// `close()` the offered transport is closed immediately and the
    /// connection is not tracked, but a distinct id is still returned.
    pub async fn add_client(
        &self,
        user_id: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> ConnectionId {
        let user_id = user_id.into();

        if self.is_closed() {
            transport.close();
            return self.registry.issue_id();
        }

        let id = self.registry.add(user_id.clone(), transport).await;
        self.heartbeats.touch(id).await;
        // A concurrent close() may have drained the registry between the
        // two inserts above; undo so nothing outlives the shutdown.
        if self.is_closed() {
            if let Some(connection) = self.registry.remove(id).await {
                connection.transport.close();
            }
            self.heartbeats.remove(id).await;
            return id;
        }
        self.metrics.record_connection_opened();
        debug!(%id, %user_id, "client registered");

        self.emit(&Event::Connected {
            connection_id: id,
            user_id,
        });

        id
    }

    /// Removes a connection, its room memberships, and its heartbeat state.
    ///
    /// Removing an unknown id is a no-op.
    pub async fn remove_client(&self, id: ConnectionId) {
        // Room and heartbeat state goes first, and unconditionally: a
        // racing join_room or heartbeat may have re-inserted entries for
        // an id the registry no longer knows.
        self.rooms.leave_all(id).await;
        self.heartbeats.remove(id).await;

        let Some(connection) = self.registry.remove(id).await else {
            return;
        };

        connection.transport.close();
        self.metrics.record_connection_closed();
        debug!(%id, user_id = %connection.user_id, "client removed");

        self.emit(&Event::Disconnected {
            connection_id: id,
            user_id: connection.user_id,
        });
    }

    /// Returns a snapshot of the connection ids owned by a user.
    pub async fn clients_by_user(&self, user_id: &str) -> Vec<ConnectionId> {
        self.registry.clients_by_user(user_id).await
    }

    /// Returns the number of live connections.
    pub async fn client_count(&self) -> usize {
        self.registry.client_count().await
    }

    // ---- rooms --------------------------------------------------------------

    /// Adds a connection to a room. Unknown ids are ignored; joining the
    /// same room twice is idempotent.
    pub async fn join_room(&self, id: ConnectionId, room: impl Into<String>) {
        if !self.registry.contains(id).await {
            return;
        }
        let room = room.into();
        self.rooms.join(id, room.clone()).await;
        // The connection may have been removed between the registry check
        // and the insert; undo so no removed id lingers in the room.
        if !self.registry.contains(id).await {
            self.rooms.leave(id, &room).await;
        }
    }

    /// Removes a connection from a room. Leaving a room not joined is a no-op.
    pub async fn leave_room(&self, id: ConnectionId, room: &str) {
        self.rooms.leave(id, room).await;
    }

    /// Returns a snapshot of a room's members; empty if the room has none.
    pub async fn room_clients(&self, room: &str) -> Vec<ConnectionId> {
        self.rooms.members(room).await
    }

    /// Returns the number of rooms with at least one member.
    pub async fn room_count(&self) -> usize {
        self.rooms.room_count().await
    }

    // ---- heartbeats ---------------------------------------------------------

    /// Records a liveness signal for a connection. Unknown ids are ignored.
    pub async fn heartbeat(&self, id: ConnectionId) {
        if !self.registry.contains(id).await {
            return;
        }
        self.heartbeats.touch(id).await;
        // Same removal race as join_room: drop the entry if the
        // connection vanished while we held neither lock.
        if !self.registry.contains(id).await {
            self.heartbeats.remove(id).await;
        }
    }

    /// Returns true if the connection exists and its last liveness signal
    /// is within the configured staleness threshold.
    pub async fn is_client_alive(&self, id: ConnectionId) -> bool {
        self.heartbeats.is_alive(id).await
    }

    /// Removes every connection whose liveness window has elapsed.
    ///
    /// Returns the number of connections removed. Disconnection hooks fire
    /// for each, exactly as for an explicit `remove_client`.
    pub async fn sweep_stale(&self) -> usize {
        let stale = self.heartbeats.stale_ids().await;
        for id in &stale {
            debug!(id = %id, "sweeping stale connection");
            self.remove_client(*id).await;
        }
        stale.len()
    }

    /// Spawns the periodic stale sweep, if `sweep_interval` is configured.
    ///
    /// The task runs until the manager is closed or the handle is aborted.
    #[must_use]
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let interval = self.config.sweep_interval?;
        let manager = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if manager.is_closed() {
                    break;
                }
                let swept = manager.sweep_stale().await;
                if swept > 0 {
                    info!(swept, "removed stale connections");
                }
            }
        }))
    }

    // ---- dispatch -----------------------------------------------------------

    /// Sends a message to one connection. Best-effort: unknown ids and
    /// closed transports are silent no-ops, and transport errors are
    /// reported through the error hook, never to the caller.
    pub async fn send_to_client(&self, id: ConnectionId, message: &Message) {
        self.dispatch(&[id], message).await;
    }

    /// Sends a message to every connection owned by a user.
    pub async fn send_to_user(&self, user_id: &str, message: &Message) {
        let targets = self.registry.clients_by_user(user_id).await;
        self.dispatch(&targets, message).await;
    }

    /// Sends a message to every registered connection.
    pub async fn broadcast(&self, message: &Message) {
        let targets = self.registry.all_ids().await;
        self.dispatch(&targets, message).await;
    }

    /// Sends a message to every current member of a room.
    pub async fn broadcast_to_room(&self, room: &str, message: &Message) {
        let targets = self.rooms.members(room).await;
        self.dispatch(&targets, message).await;
    }

    /// Serializes the message once and delivers it to a snapshot of targets.
    async fn dispatch(&self, targets: &[ConnectionId], message: &Message) {
        if self.is_closed() || targets.is_empty() {
            return;
        }

        let frame = match message.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to serialize outbound message");
                self.emit(&Event::Error {
                    connection_id: None,
                    detail: format!("serialization failed: {e}"),
                });
                return;
            }
        };

        for &id in targets {
            self.deliver(id, &frame).await;
        }
    }

    /// Delivers one frame to one connection.
    async fn deliver(&self, id: ConnectionId, frame: &str) {
        let Some(transport) = self.registry.transport(id).await else {
            // Gone between snapshot and delivery: not an error.
            self.metrics.record_message_dropped();
            return;
        };

        if !transport.is_open() {
            self.metrics.record_message_dropped();
            return;
        }

        match transport.send(frame) {
            Ok(()) => self.metrics.record_message_sent(),
            Err(e) => {
                self.metrics.record_message_dropped();
                debug!(%id, error = %e, "delivery failed");
                self.emit(&Event::Error {
                    connection_id: Some(id),
                    detail: format!("delivery failed: {e}"),
                });
            }
        }
    }

    // ---- inbound ------------------------------------------------------------

    /// Handles a raw inbound frame from a connection.
    ///
    /// Any inbound frame touches the heartbeat, parseable or not. A
    /// malformed frame is then dropped (surfaced via the error hook) and
    /// the connection stays registered. A parsed frame raises the message
    /// event; a `PING` is additionally answered with a `PONG` to the
    /// sender.
    pub async fn handle_message(&self, id: ConnectionId, raw: &str) {
        self.metrics.record_message_received();
        self.heartbeat(id).await;

        let message = match Message::from_json(raw) {
            Ok(message) => message,
            Err(e) => {
                self.metrics.record_parse_error();
                debug!(%id, error = %e, "dropping malformed frame");
                self.emit(&Event::Error {
                    connection_id: Some(id),
                    detail: format!("malformed frame: {e}"),
                });
                return;
            }
        };

        let is_ping = message.kind == MessageType::Ping;
        self.emit(&Event::Message {
            connection_id: id,
            message,
        });

        if is_ping {
            self.send_to_client(id, &Message::pong()).await;
        }
    }

    /// Reports a client error to the error hook.
    ///
    /// The connection remains registered; pair with `remove_client` when the
    /// error is fatal.
    pub async fn handle_error(&self, id: ConnectionId, detail: impl Into<String>) {
        self.emit(&Event::Error {
            connection_id: Some(id),
            detail: detail.into(),
        });
    }

    // ---- hooks --------------------------------------------------------------

    /// Registers a handler for connection events.
    pub fn on_connection<F>(&self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.hooks.register(EventKind::Connection, handler);
    }

    /// Registers a handler for disconnection events.
    pub fn on_disconnection<F>(&self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.hooks.register(EventKind::Disconnection, handler);
    }

    /// Registers a handler for message events.
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.hooks.register(EventKind::Message, handler);
    }

    /// Registers a handler for error events.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.hooks.register(EventKind::Error, handler);
    }

    // ---- stats & shutdown ---------------------------------------------------

    /// Returns current connection and room counts.
    pub async fn stats(&self) -> ManagerStats {
        ManagerStats {
            connected_clients: self.registry.client_count().await,
            total_rooms: self.rooms.room_count().await,
        }
    }

    /// Shuts the manager down: closes every transport, raises disconnection
    /// events, and clears all state. Idempotent; no send can succeed
    /// afterwards.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let connections = self.registry.drain().await;
        let count = connections.len();

        for connection in connections {
            connection.transport.close();
            self.metrics.record_connection_closed();
            self.emit(&Event::Disconnected {
                connection_id: connection.id,
                user_id: connection.user_id,
            });
        }

        self.rooms.clear().await;
        self.heartbeats.clear().await;

        info!(connections = count, "manager closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ChannelTransport, TransportError};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Transport whose send always fails; used to exercise failure isolation.
    #[derive(Debug)]
    struct FailingTransport;

    impl Transport for FailingTransport {
        fn send(&self, _frame: &str) -> Result<(), TransportError> {
            Err(TransportError::Io("connection reset".to_string()))
        }

        fn is_open(&self) -> bool {
            true
        }

        fn close(&self) {}
    }

    fn manager() -> RealtimeManager {
        RealtimeManager::default()
    }

    fn transport() -> (Arc<ChannelTransport>, mpsc::Receiver<String>) {
        let (transport, rx) = ChannelTransport::pair(32);
        (Arc::new(transport), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn test_add_client_ids_unique_per_user() {
        let manager = manager();
        let mut seen = std::collections::HashSet::new();

        for _ in 0..10 {
            let (t, rx) = transport();
            std::mem::forget(rx);
            assert!(seen.insert(manager.add_client("u1", t).await));
        }

        assert_eq!(manager.client_count().await, 10);
    }

    #[tokio::test]
    async fn test_remove_client_idempotent() {
        let manager = manager();
        let (t, _rx) = transport();
        let (t2, _rx2) = transport();

        let a = manager.add_client("u1", t).await;
        let _b = manager.add_client("u2", t2).await;

        manager.remove_client(a).await;
        assert_eq!(manager.client_count().await, 1);

        manager.remove_client(a).await;
        assert_eq!(manager.client_count().await, 1);
    }

    #[tokio::test]
    async fn test_room_consistency_after_removal() {
        let manager = manager();
        let (t, _rx) = transport();
        let (t2, _rx2) = transport();

        let a = manager.add_client("u1", t).await;
        let b = manager.add_client("u1", t2).await;

        manager.join_room(a, "room-1").await;
        manager.join_room(b, "room-1").await;
        manager.join_room(a, "room-2").await;
        assert_eq!(manager.room_count().await, 2);

        manager.remove_client(a).await;

        assert_eq!(manager.room_clients("room-1").await, vec![b]);
        // room-2 only held the removed connection.
        assert_eq!(manager.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_join_room_unknown_id_ignored() {
        let manager = manager();
        let (t, _rx) = transport();
        let a = manager.add_client("u1", t).await;
        manager.remove_client(a).await;

        manager.join_room(a, "room-1").await;

        assert_eq!(manager.room_count().await, 0);
        assert!(manager.room_clients("room-1").await.is_empty());
    }

    #[tokio::test]
    async fn test_join_room_racing_removal_leaves_no_ghost() {
        let manager = Arc::new(manager());

        for _ in 0..50 {
            let (t, _rx) = transport();
            let id = manager.add_client("u1", t).await;

            let joiner = Arc::clone(&manager);
            let remover = Arc::clone(&manager);
            let join = tokio::spawn(async move { joiner.join_room(id, "room-1").await });
            let remove = tokio::spawn(async move { remover.remove_client(id).await });
            join.await.expect("join");
            remove.await.expect("remove");

            // Whichever order the tasks interleaved in, the removed id
            // must not survive in the room.
            assert!(!manager.room_clients("room-1").await.contains(&id));
        }

        assert_eq!(manager.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_heartbeat_racing_removal_leaves_no_ghost() {
        let manager = Arc::new(manager());

        for _ in 0..50 {
            let (t, _rx) = transport();
            let id = manager.add_client("u1", t).await;

            let beater = Arc::clone(&manager);
            let remover = Arc::clone(&manager);
            let beat = tokio::spawn(async move { beater.heartbeat(id).await });
            let remove = tokio::spawn(async move { remover.remove_client(id).await });
            beat.await.expect("heartbeat");
            remove.await.expect("remove");

            assert!(!manager.is_client_alive(id).await);
        }
    }

    #[tokio::test]
    async fn test_broadcast_isolation_with_failing_transports() {
        let manager = manager();
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        manager.on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut receivers = Vec::new();
        for i in 0..3 {
            let (t, rx) = transport();
            manager.add_client(format!("good-{i}"), t).await;
            receivers.push(rx);
        }
        for i in 0..2 {
            manager
                .add_client(format!("bad-{i}"), Arc::new(FailingTransport))
                .await;
        }

        manager.broadcast(&Message::update(json!({"seq": 1}))).await;

        for rx in &mut receivers {
            assert_eq!(drain(rx).len(), 1);
        }
        assert_eq!(manager.metrics().messages_sent(), 3);
        assert_eq!(manager.metrics().messages_dropped(), 2);
        assert_eq!(errors.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_send_to_user_targets_only_owner() {
        let manager = manager();
        let (t1, mut rx1) = transport();
        let (t2, mut rx2) = transport();
        let (t3, mut rx3) = transport();

        manager.add_client("u1", t1).await;
        manager.add_client("u1", t2).await;
        manager.add_client("u2", t3).await;

        manager
            .send_to_user("u1", &Message::notification(json!({"n": 1})))
            .await;

        assert_eq!(drain(&mut rx1).len(), 1);
        assert_eq!(drain(&mut rx2).len(), 1);
        assert!(drain(&mut rx3).is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_to_room_excludes_former_members() {
        let manager = manager();
        let (t1, mut rx1) = transport();
        let (t2, mut rx2) = transport();

        let a = manager.add_client("u1", t1).await;
        let b = manager.add_client("u2", t2).await;

        manager.join_room(a, "room-1").await;
        manager.join_room(b, "room-1").await;
        manager.leave_room(b, "room-1").await;

        manager
            .broadcast_to_room("room-1", &Message::update(json!({})))
            .await;

        assert_eq!(drain(&mut rx1).len(), 1);
        assert!(drain(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn test_send_to_client_unknown_id_is_noop() {
        let manager = manager();
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        manager.on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let (t, _rx) = transport();
        let a = manager.add_client("u1", t).await;
        manager.remove_client(a).await;

        manager.send_to_client(a, &Message::ping()).await;

        // Unknown recipient is "no matching recipients", not an error.
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_per_connection_delivery_order() {
        let manager = manager();
        let (t, mut rx) = transport();
        let a = manager.add_client("u1", t).await;

        for seq in 0..3 {
            manager
                .send_to_client(a, &Message::update(json!({"seq": seq})))
                .await;
        }

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 3);
        for (seq, frame) in frames.iter().enumerate() {
            let parsed = Message::from_json(frame).expect("frame");
            assert_eq!(parsed.payload["seq"], seq as u64);
        }
    }

    #[tokio::test]
    async fn test_liveness_window() {
        let config = ManagerConfig::new().with_stale_after(Duration::from_millis(30));
        let manager = RealtimeManager::new(config).expect("manager");
        let (t, _rx) = transport();

        let a = manager.add_client("u1", t).await;
        assert!(manager.is_client_alive(a).await);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!manager.is_client_alive(a).await);

        manager.heartbeat(a).await;
        assert!(manager.is_client_alive(a).await);
    }

    #[tokio::test]
    async fn test_sweep_stale_removes_and_notifies() {
        let config = ManagerConfig::new().with_stale_after(Duration::from_millis(20));
        let manager = RealtimeManager::new(config).expect("manager");

        let disconnected = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&disconnected);
        manager.on_disconnection(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let (t, _rx) = transport();
        manager.add_client("u1", t).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        let swept = manager.sweep_stale().await;

        assert_eq!(swept, 1);
        assert_eq!(manager.client_count().await, 0);
        assert_eq!(disconnected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_spawn_sweeper_removes_stale_connections() {
        let config = ManagerConfig::new()
            .with_stale_after(Duration::from_millis(20))
            .with_sweep_interval(Duration::from_millis(10));
        let manager = Arc::new(RealtimeManager::new(config).expect("manager"));

        let (t, _rx) = transport();
        manager.add_client("u1", t).await;

        let handle = manager.spawn_sweeper().expect("sweeper");

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(manager.client_count().await, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_spawn_sweeper_disabled_without_interval() {
        let manager = Arc::new(manager());
        assert!(manager.spawn_sweeper().is_none());
    }

    #[tokio::test]
    async fn test_handle_message_malformed_keeps_connection() {
        let manager = manager();
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        manager.on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let (t, _rx) = transport();
        let a = manager.add_client("u1", t).await;

        manager.handle_message(a, "not json").await;

        assert_eq!(manager.client_count().await, 1);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(manager.metrics().parse_errors(), 1);
    }

    #[tokio::test]
    async fn test_handle_message_malformed_still_refreshes_liveness() {
        let config = ManagerConfig::new().with_stale_after(Duration::from_millis(60));
        let manager = RealtimeManager::new(config).expect("manager");

        let (t, _rx) = transport();
        let a = manager.add_client("u1", t).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        manager.handle_message(a, "not json").await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        // Inbound traffic counts as liveness even when it fails to parse.
        assert!(manager.is_client_alive(a).await);
        assert_eq!(manager.client_count().await, 1);
    }

    #[tokio::test]
    async fn test_handle_message_raises_message_event() {
        let manager = manager();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager.on_message(move |event| {
            if let Event::Message { message, .. } = event {
                sink.lock().expect("lock").push(message.kind);
            }
        });

        let (t, _rx) = transport();
        let a = manager.add_client("u1", t).await;

        manager
            .handle_message(a, r#"{"type":"CUSTOM","payload":{"k":"v"}}"#)
            .await;

        assert_eq!(*seen.lock().expect("lock"), vec![MessageType::Custom]);
    }

    #[tokio::test]
    async fn test_handle_message_ping_answers_pong() {
        let manager = manager();
        let (t, mut rx) = transport();
        let a = manager.add_client("u1", t).await;

        manager.handle_message(a, r#"{"type":"PING"}"#).await;

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        let parsed = Message::from_json(&frames[0]).expect("frame");
        assert_eq!(parsed.kind, MessageType::Pong);
        assert!(manager.is_client_alive(a).await);
    }

    #[tokio::test]
    async fn test_handle_error_keeps_connection_registered() {
        let manager = manager();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        manager.on_error(move |event| {
            if let Event::Error { detail, .. } = event {
                *sink.lock().expect("lock") = Some(detail.clone());
            }
        });

        let (t, _rx) = transport();
        let a = manager.add_client("u1", t).await;

        manager.handle_error(a, "client misbehaved").await;

        assert_eq!(manager.client_count().await, 1);
        assert_eq!(
            seen.lock().expect("lock").as_deref(),
            Some("client misbehaved")
        );
    }

    #[tokio::test]
    async fn test_connection_and_disconnection_events() {
        let manager = manager();
        let log = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&log);
        manager.on_connection(move |event| {
            if let Event::Connected { user_id, .. } = event {
                sink.lock().expect("lock").push(format!("+{user_id}"));
            }
        });
        let sink = Arc::clone(&log);
        manager.on_disconnection(move |event| {
            if let Event::Disconnected { user_id, .. } = event {
                sink.lock().expect("lock").push(format!("-{user_id}"));
            }
        });

        let (t, _rx) = transport();
        let a = manager.add_client("u1", t).await;
        manager.remove_client(a).await;

        assert_eq!(*log.lock().expect("lock"), vec!["+u1", "-u1"]);
    }

    #[tokio::test]
    async fn test_stats() {
        let manager = manager();
        let (t1, _rx1) = transport();
        let (t2, _rx2) = transport();

        let a = manager.add_client("u1", t1).await;
        let b = manager.add_client("u2", t2).await;
        manager.join_room(a, "room-1").await;
        manager.join_room(b, "room-2").await;

        let stats = manager.stats().await;
        assert_eq!(stats.connected_clients, 2);
        assert_eq!(stats.total_rooms, 2);
    }

    #[tokio::test]
    async fn test_stats_serialization() {
        let stats = ManagerStats {
            connected_clients: 3,
            total_rooms: 1,
        };
        let json = serde_json::to_string(&stats).expect("serialize");
        assert_eq!(json, r#"{"connectedClients":3,"totalRooms":1}"#);
    }

    #[tokio::test]
    async fn test_close_is_terminal_and_idempotent() {
        let manager = manager();
        let (t, mut rx) = transport();
        let a = manager.add_client("u1", t).await;
        manager.join_room(a, "room-1").await;

        manager.close().await;
        assert!(manager.is_closed());
        assert_eq!(manager.client_count().await, 0);
        assert_eq!(manager.room_count().await, 0);

        // Sends after close are no-ops.
        manager.send_to_client(a, &Message::ping()).await;
        manager.broadcast(&Message::ping()).await;
        assert!(drain(&mut rx).is_empty());

        // Second close changes nothing.
        manager.close().await;
        assert_eq!(manager.metrics().connections_closed(), 1);
    }

    #[tokio::test]
    async fn test_add_client_after_close_refused() {
        let manager = manager();
        manager.close().await;

        let (t, _rx) = transport();
        let transport_ref = Arc::clone(&t);
        let id = manager.add_client("u1", t).await;

        assert_eq!(manager.client_count().await, 0);
        assert!(!transport_ref.is_open());
        // The id is still fresh and distinct.
        assert!(id.as_u64() > 0);
    }

    #[tokio::test]
    async fn test_end_to_end_room_scenario() {
        let manager = manager();
        let (ta, mut rx_a) = transport();
        let (tb, mut rx_b) = transport();
        let (tc, mut rx_c) = transport();

        let a = manager.add_client("u1", ta).await;
        let b = manager.add_client("u1", tb).await;
        let c = manager.add_client("u2", tc).await;

        manager.join_room(a, "room-1").await;
        manager.join_room(b, "room-1").await;

        manager
            .broadcast_to_room("room-1", &Message::update(json!({})))
            .await;

        assert_eq!(drain(&mut rx_a).len(), 1);
        assert_eq!(drain(&mut rx_b).len(), 1);
        assert!(drain(&mut rx_c).is_empty());

        let mut members = manager.room_clients("room-1").await;
        members.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(members, expected);

        let before = manager.client_count().await;
        manager.remove_client(a).await;

        assert_eq!(manager.room_clients("room-1").await, vec![b]);
        assert_eq!(manager.client_count().await, before - 1);
        assert!(manager.clients_by_user("u2").await.contains(&c));
    }
}
