//! Relaycast core - real-time connection and room broadcast management.
//!
//! This crate tracks live client connections, groups them into named rooms,
//! and delivers typed JSON messages to one client, to all connections of a
//! user, to a room, or to everyone. Delivery is best-effort and failure-
//! isolated: one dead socket never breaks a broadcast, and nothing raises
//! across the public boundary. Liveness is tracked through heartbeats,
//! independent of the underlying transport.
//!
//! # Components
//!
//! - [`connection`]: Connection ids and the connection registry
//! - [`rooms`]: Room membership index
//! - [`heartbeat`]: Liveness tracking
//! - [`messages`]: Wire message types
//! - [`transport`]: Transport trait and channel-backed implementation
//! - [`events`]: Event hook registry
//! - [`manager`]: The realtime manager facade
//! - [`config`]: Manager configuration
//! - [`metrics`]: Manager metrics

pub mod config;
pub mod connection;
pub mod events;
pub mod heartbeat;
pub mod manager;
pub mod messages;
pub mod metrics;
pub mod rooms;
pub mod transport;

pub use config::{ConfigError, ManagerConfig};
pub use connection::{Connection, ConnectionId, ConnectionRegistry};
pub use events::{Event, EventHooks, EventKind};
pub use heartbeat::HeartbeatTracker;
pub use manager::{ManagerStats, RealtimeManager};
pub use messages::{Message, MessageType};
pub use metrics::{RelayMetrics, RelayMetricsSnapshot};
pub use rooms::RoomIndex;
pub use transport::{ChannelTransport, Transport, TransportError};
