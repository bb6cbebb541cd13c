//! Client error types.

/// Errors reported by the WebSocket client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    Closed,

    /// Failed to serialize a message.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection(err.to_string())
    }
}
