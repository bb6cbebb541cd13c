//! Relaycast client SDK.
//!
//! A small WebSocket client speaking the Relaycast wire format: connect,
//! send typed messages, receive server events, and keep the connection
//! alive with automatic PING heartbeats.
//!
//! # Components
//!
//! - [`config`]: Client configuration
//! - [`error`]: Client error types
//! - [`client`]: The WebSocket client

pub mod client;
pub mod config;
pub mod error;

pub use client::RelayClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use relaycast_core::{Message, MessageType};
