//! Client configuration.
//!
//! Provides configuration options for the WebSocket client.

use std::time::Duration;

use super::error::ClientError;

/// Default WebSocket URL.
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8080/ws";

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// WebSocket client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server URL.
    pub url: String,

    /// User id to connect as.
    pub user: String,

    /// Interval between wire-level PING messages.
    pub heartbeat_interval: Duration,

    /// Maximum time to wait for the connection handshake.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            user: String::new(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the given URL and user.
    #[must_use]
    pub fn new(url: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            ..Default::default()
        }
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns the connection URL with the user id appended.
    #[must_use]
    pub fn connection_url(&self) -> String {
        if self.url.contains('?') {
            format!("{}&user={}", self.url, self.user)
        } else {
            format!("{}?user={}", self.url, self.user)
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or user is invalid.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.url.is_empty() {
            return Err(ClientError::InvalidConfig("url cannot be empty".to_string()));
        }

        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(ClientError::InvalidConfig(
                "url must start with ws:// or wss://".to_string(),
            ));
        }

        if self.user.is_empty() {
            return Err(ClientError::InvalidConfig(
                "user cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
