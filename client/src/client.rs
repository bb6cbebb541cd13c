//! WebSocket client implementation.
//!
//! Connects to a Relaycast server, speaks the wire message format, and
//! keeps the connection alive with periodic PING messages.

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use relaycast_core::Message as WireMessage;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::config::ClientConfig;
use super::error::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// WebSocket client for a Relaycast server.
#[derive(Debug)]
pub struct RelayClient {
    config: ClientConfig,
    sink: Arc<Mutex<Option<WsSink>>>,
    event_tx: mpsc::Sender<WireMessage>,
    event_rx: Arc<Mutex<mpsc::Receiver<WireMessage>>>,
    connected: Arc<RwLock<bool>>,
}

impl RelayClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::channel(1000);

        Ok(Self {
            config,
            sink: Arc::new(Mutex::new(None)),
            event_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
            connected: Arc::new(RwLock::new(false)),
        })
    }

    /// Creates a client for the given URL and user.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_url(
        url: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<Self, ClientError> {
        Self::new(ClientConfig::new(url, user))
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns true if connected.
    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Connects to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails or times out.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let url = self.config.connection_url();

        let handshake = tokio_tungstenite::connect_async(&url);
        let (ws_stream, _) = tokio::time::timeout(self.config.connect_timeout, handshake)
            .await
            .map_err(|_| ClientError::Connection("handshake timed out".to_string()))?
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        let (sink, source) = ws_stream.split();

        *self.sink.lock().await = Some(sink);
        *self.connected.write().await = true;

        self.spawn_reader(source);
        self.spawn_heartbeat();

        Ok(())
    }

    /// Spawns the message reader task.
    fn spawn_reader(&self, mut source: WsSource) {
        let event_tx = self.event_tx.clone();
        let connected = Arc::clone(&self.connected);

        tokio::spawn(async move {
            while let Some(result) = source.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        match WireMessage::from_json(&text) {
                            Ok(msg) => {
                                let _ = event_tx.send(msg).await;
                            }
                            Err(e) => {
                                debug!(error = %e, "dropping unparseable frame");
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        *connected.write().await = false;
                        break;
                    }
                    Err(_) => {
                        *connected.write().await = false;
                        break;
                    }
                    _ => {}
                }
            }
        });
    }

    /// Spawns the heartbeat task.
    fn spawn_heartbeat(&self) {
        let sink = Arc::clone(&self.sink);
        let connected = Arc::clone(&self.connected);
        let interval = self.config.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;

                if !*connected.read().await {
                    break;
                }

                let ping = WireMessage::new(
                    relaycast_core::MessageType::Ping,
                    serde_json::json!({ "ts": chrono::Utc::now().timestamp_millis() }),
                );
                if let Ok(json) = ping.to_json() {
                    if let Some(ref mut s) = *sink.lock().await {
                        let _ = s.send(Message::Text(json.into())).await;
                    }
                }
            }
        });
    }

    /// Sends a message to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is not connected or the send fails.
    pub async fn send(&self, msg: &WireMessage) -> Result<(), ClientError> {
        let json = msg
            .to_json()
            .map_err(|e| ClientError::Serialization(e.to_string()))?;

        let mut sink_guard = self.sink.lock().await;
        let sink = sink_guard.as_mut().ok_or(ClientError::NotConnected)?;

        sink.send(Message::Text(json.into()))
            .await
            .map_err(|e| ClientError::SendFailed(e.to_string()))?;

        Ok(())
    }

    /// Sends an application-defined message.
    ///
    /// # Errors
    ///
    /// Returns an error if the send fails.
    pub async fn send_custom(&self, payload: Value) -> Result<(), ClientError> {
        self.send(&WireMessage::custom(payload)).await
    }

    /// Sends a liveness ping.
    ///
    /// # Errors
    ///
    /// Returns an error if the send fails.
    pub async fn ping(&self) -> Result<(), ClientError> {
        self.send(&WireMessage::ping()).await
    }

    /// Returns the next message from the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed.
    pub async fn next_event(&self) -> Result<WireMessage, ClientError> {
        self.event_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or(ClientError::Closed)
    }

    /// Closes the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close fails.
    pub async fn close(&self) -> Result<(), ClientError> {
        *self.connected.write().await = false;

        if let Some(ref mut sink) = *self.sink.lock().await {
            let _ = sink.send(Message::Close(None)).await;
        }

        *self.sink.lock().await = None;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_new() {
        let config = ClientConfig::new("wss://example.com/ws", "u1");
        let client = RelayClient::new(config);
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_with_url() {
        let client = RelayClient::with_url("wss://example.com/ws", "u1");
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_invalid_config() {
        let config = ClientConfig::new("", "u1");
        let client = RelayClient::new(config);
        assert!(client.is_err());
    }

    #[test]
    fn test_client_config_access() {
        let client = RelayClient::with_url("wss://example.com/ws", "u1").expect("client");
        assert_eq!(client.config().url, "wss://example.com/ws");
        assert_eq!(client.config().user, "u1");
    }

    #[tokio::test]
    async fn test_client_not_connected_initially() {
        let client = RelayClient::with_url("wss://example.com/ws", "u1").expect("client");
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_client_send_before_connect_fails() {
        let client = RelayClient::with_url("wss://example.com/ws", "u1").expect("client");
        let result = client.send(&WireMessage::ping()).await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
    }
}
