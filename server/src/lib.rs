//! Relaycast server - WebSocket binding for the realtime manager.
//!
//! Owns the raw sockets and adapts them to the core manager's transport
//! abstraction. Exposes three routes: `GET /ws` (WebSocket upgrade),
//! `GET /stats` (manager statistics), and `GET /healthz` (liveness probe).
//!
//! # Components
//!
//! - [`config`]: Server configuration
//! - [`state`]: Shared application state
//! - [`handler`]: WebSocket upgrade and connection loop
//! - [`server`]: Router and server runner

pub mod config;
pub mod handler;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use handler::ws_handler;
pub use server::{router, Server};
pub use state::AppState;
