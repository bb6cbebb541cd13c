//! Wire message types.
//!
//! Defines the JSON message format exchanged with clients. Every frame is a
//! UTF-8 JSON object with a `type` tag and an opaque `payload`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fixed set of wire message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    /// One-way notification to a client.
    Notification,

    /// Incremental state update.
    Update,

    /// Error report.
    Error,

    /// Liveness probe.
    Ping,

    /// Liveness response.
    Pong,

    /// Application-defined message.
    Custom,
}

impl MessageType {
    /// Returns the wire tag for this message type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Notification => "NOTIFICATION",
            Self::Update => "UPDATE",
            Self::Error => "ERROR",
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Custom => "CUSTOM",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A wire message: a typed tag plus an opaque payload.
///
/// Messages are immutable value objects; the dispatcher serializes a message
/// once per send call so every recipient receives an identical frame. Field
/// order on the wire is always `type` then `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message type tag.
    #[serde(rename = "type")]
    pub kind: MessageType,

    /// Arbitrary structured payload; JSON null when absent on the wire.
    #[serde(default)]
    pub payload: Value,
}

impl Message {
    /// Creates a message of the given type.
    #[must_use]
    pub const fn new(kind: MessageType, payload: Value) -> Self {
        Self { kind, payload }
    }

    /// Creates a notification message.
    #[must_use]
    pub const fn notification(payload: Value) -> Self {
        Self::new(MessageType::Notification, payload)
    }

    /// Creates an update message.
    #[must_use]
    pub const fn update(payload: Value) -> Self {
        Self::new(MessageType::Update, payload)
    }

    /// Creates an error message.
    #[must_use]
    pub const fn error(payload: Value) -> Self {
        Self::new(MessageType::Error, payload)
    }

    /// Creates a ping message.
    #[must_use]
    pub const fn ping() -> Self {
        Self::new(MessageType::Ping, Value::Null)
    }

    /// Creates a pong message.
    #[must_use]
    pub const fn pong() -> Self {
        Self::new(MessageType::Pong, Value::Null)
    }

    /// Creates an application-defined message.
    #[must_use]
    pub const fn custom(payload: Value) -> Self {
        Self::new(MessageType::Custom, payload)
    }

    /// Serializes the message to its wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a raw wire frame into a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a valid message object.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_type_as_str() {
        assert_eq!(MessageType::Notification.as_str(), "NOTIFICATION");
        assert_eq!(MessageType::Update.as_str(), "UPDATE");
        assert_eq!(MessageType::Error.as_str(), "ERROR");
        assert_eq!(MessageType::Ping.as_str(), "PING");
        assert_eq!(MessageType::Pong.as_str(), "PONG");
        assert_eq!(MessageType::Custom.as_str(), "CUSTOM");
    }

    #[test]
    fn test_message_serialize_field_order() {
        let msg = Message::update(json!({"seq": 1}));
        let wire = msg.to_json().expect("serialize");
        assert!(wire.starts_with("{\"type\":\"UPDATE\""));
        assert!(wire.contains("\"payload\""));
    }

    #[test]
    fn test_message_ping_pong() {
        let ping = Message::ping();
        assert_eq!(ping.kind, MessageType::Ping);
        assert!(ping.payload.is_null());

        let pong = Message::pong();
        assert_eq!(pong.kind, MessageType::Pong);
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = Message::notification(json!({"text": "hello"}));
        let wire = msg.to_json().expect("serialize");
        let parsed = Message::from_json(&wire).expect("parse");
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_message_parse_missing_payload() {
        let msg = Message::from_json(r#"{"type":"PING"}"#).expect("parse");
        assert_eq!(msg.kind, MessageType::Ping);
        assert!(msg.payload.is_null());
    }

    #[test]
    fn test_message_parse_unknown_type() {
        let result = Message::from_json(r#"{"type":"BOGUS","payload":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_message_parse_malformed() {
        assert!(Message::from_json("not json").is_err());
        assert!(Message::from_json("{}").is_err());
        assert!(Message::from_json("[1,2,3]").is_err());
    }

    #[test]
    fn test_message_custom_payload_preserved() {
        let msg = Message::custom(json!({"kind": "typing", "room": "room-1"}));
        let wire = msg.to_json().expect("serialize");
        let parsed = Message::from_json(&wire).expect("parse");
        assert_eq!(parsed.payload["kind"], "typing");
    }
}
