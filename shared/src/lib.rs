//! Wire types shared by the relay server and its clients.
//!
//! Every frame on the wire is a JSON object carrying a `type` discriminator.
//! The server only ever originates two of them (`id` and `leave`); everything
//! a client sends is relayed verbatim, and only `move` frames are remembered.

use serde::{Deserialize, Serialize};

/// Discriminator of a client position update.
pub const MOVE_TYPE: &str = "move";

/// Messages originated by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Sent once to a freshly connected client with its identity.
    Id { id: String },
    /// Sent to remaining clients after a client has been cleaned up.
    Leave { id: String },
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        // Both variants are a tag plus one string field.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Classification of an inbound frame by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Move,
    Id,
    Leave,
    /// Well-formed envelope with some other discriminator.
    Other(String),
    /// Not a JSON object, or no string `type` field.
    Unknown,
}

impl MessageKind {
    /// Whether frames of this kind update the sender's cached state.
    pub fn is_state_update(&self) -> bool {
        matches!(self, MessageKind::Move)
    }
}

#[derive(Deserialize)]
struct Discriminator {
    #[serde(rename = "type")]
    kind: String,
}

/// Reads the `type` field of a JSON envelope.
///
/// Other fields are ignored and may have any shape.
pub fn classify(payload: &[u8]) -> MessageKind {
    match serde_json::from_slice::<Discriminator>(payload) {
        Ok(envelope) => match envelope.kind.as_str() {
            MOVE_TYPE => MessageKind::Move,
            "id" => MessageKind::Id,
            "leave" => MessageKind::Leave,
            _ => MessageKind::Other(envelope.kind),
        },
        Err(_) => MessageKind::Unknown,
    }
}

/// An entry of the player roster.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: String,
}

impl Player {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_message_format() {
        let json = ServerMessage::Id { id: "abc".into() }.to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "id");
        assert_eq!(value["id"], "abc");
    }

    #[test]
    fn test_leave_message_format() {
        let json = ServerMessage::Leave { id: "abc".into() }.to_json();
        assert_eq!(json, r#"{"type":"leave","id":"abc"}"#);
    }

    #[test]
    fn test_classify_move() {
        let kind = classify(br#"{"type":"move","x":1,"y":2,"id":"a"}"#);
        assert_eq!(kind, MessageKind::Move);
        assert!(kind.is_state_update());
    }

    #[test]
    fn test_classify_ignores_field_order_and_whitespace() {
        // A fixed-offset check would miss both of these.
        assert_eq!(
            classify(br#"{"x":1,"y":2,"type":"move"}"#),
            MessageKind::Move
        );
        assert_eq!(
            classify(b"{ \"type\" :  \"move\" , \"x\": 1 }"),
            MessageKind::Move
        );
    }

    #[test]
    fn test_classify_other_types() {
        assert_eq!(classify(br#"{"type":"leave","id":"a"}"#), MessageKind::Leave);
        assert_eq!(classify(br#"{"type":"id","id":"a"}"#), MessageKind::Id);
        assert_eq!(
            classify(br#"{"type":"chat","text":"hi"}"#),
            MessageKind::Other("chat".into())
        );
        assert!(!classify(br#"{"type":"chat"}"#).is_state_update());
    }

    #[test]
    fn test_classify_malformed() {
        assert_eq!(classify(b"not json"), MessageKind::Unknown);
        assert_eq!(classify(b""), MessageKind::Unknown);
        assert_eq!(classify(br#"{"x":1}"#), MessageKind::Unknown);
        assert_eq!(classify(br#"{"type":5}"#), MessageKind::Unknown);
        // Short payloads must not panic.
        assert_eq!(classify(b"{"), MessageKind::Unknown);
    }

    #[test]
    fn test_player_serialization() {
        let player = Player::new("p1");
        assert_eq!(serde_json::to_string(&player).unwrap(), r#"{"id":"p1"}"#);
    }
}
