//! Core data types for the chat system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::chat::codec::BROADCAST_TARGET;

/// Unique identifier for a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Create a new random message ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of one edit/delete action, distinct from the id of the
/// message it targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(pub String);

impl CommandId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CommandId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// What a message represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    /// A photo we sent; `attachment` points at the local file.
    Photo,
    /// Generated locally, e.g. a completed incoming file transfer.
    System,
}

/// Who a message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// Everyone on the mesh (the global log).
    All,
    /// A single partner, by display name.
    Peer(String),
}

impl Target {
    /// Parse the target field of a text frame.
    pub fn from_wire(field: &str) -> Self {
        if field == BROADCAST_TARGET {
            Target::All
        } else {
            Target::Peer(field.to_string())
        }
    }

    /// Value carried in the target field of a text frame.
    pub fn as_wire(&self) -> &str {
        match self {
            Target::All => BROADCAST_TARGET,
            Target::Peer(name) => name,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Assigned once by the originating node.
    pub id: MessageId,
    /// Message content; replaced in place by edit commands.
    pub text: String,
    /// Display name of the author.
    pub sender_name: String,
    /// When this node created or first saw the message (UTC).
    pub timestamp: DateTime<Utc>,
    /// Whether this node authored the message.
    pub is_mine: bool,
    pub kind: MessageKind,
    /// Local file backing a photo or received transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<PathBuf>,
    /// Set on the global-log copy of a private message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_from: Option<String>,
}

impl Message {
    /// Create a new outgoing text message with a fresh id.
    pub fn new_outgoing(sender_name: String, text: String) -> Self {
        Self {
            id: MessageId::new(),
            text,
            sender_name,
            timestamp: Utc::now(),
            is_mine: true,
            kind: MessageKind::Text,
            attachment: None,
            private_from: None,
        }
    }

    /// Create a message from a decoded inbound text frame.
    pub fn from_incoming(id: MessageId, sender_name: String, text: String) -> Self {
        Self {
            id,
            text,
            sender_name,
            timestamp: Utc::now(),
            is_mine: false,
            kind: MessageKind::Text,
            attachment: None,
            private_from: None,
        }
    }

    /// Create a locally generated entry for a file.
    pub fn system(sender_name: String, text: String, attachment: PathBuf) -> Self {
        Self {
            id: MessageId::new(),
            text,
            sender_name,
            timestamp: Utc::now(),
            is_mine: false,
            kind: MessageKind::System,
            attachment: Some(attachment),
            private_from: None,
        }
    }

    /// Copy of this message for the global log, marked as private.
    pub fn mirrored_from(&self, partner: &str) -> Self {
        Self {
            private_from: Some(partner.to_string()),
            ..self.clone()
        }
    }
}

/// Which log a message lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationKey {
    Global,
    Private(String),
}

impl From<&Target> for ConversationKey {
    fn from(target: &Target) -> Self {
        match target {
            Target::All => ConversationKey::Global,
            Target::Peer(name) => ConversationKey::Private(name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_generation() {
        let id1 = MessageId::new();
        let id2 = MessageId::new();
        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_command_and_message_ids_are_distinct() {
        assert_ne!(CommandId::new().as_str(), MessageId::new().as_str());
    }

    #[test]
    fn test_target_wire_form() {
        assert_eq!(Target::from_wire("ALL"), Target::All);
        assert_eq!(Target::from_wire("bob"), Target::Peer("bob".to_string()));
        assert_eq!(Target::All.as_wire(), "ALL");
        assert_eq!(Target::Peer("bob".to_string()).to_string(), "bob");
    }

    #[test]
    fn test_outgoing_vs_incoming() {
        let mine = Message::new_outgoing("alice".to_string(), "hi".to_string());
        assert!(mine.is_mine);
        assert_eq!(mine.kind, MessageKind::Text);

        let theirs = Message::from_incoming("m1".into(), "bob".to_string(), "yo".to_string());
        assert!(!theirs.is_mine);
        assert_eq!(theirs.id.as_str(), "m1");
    }

    #[test]
    fn test_mirrored_copy_keeps_identity() {
        let msg = Message::from_incoming("m1".into(), "bob".to_string(), "psst".to_string());
        let mirror = msg.mirrored_from("bob");
        assert_eq!(mirror.id, msg.id);
        assert_eq!(mirror.text, msg.text);
        assert_eq!(mirror.private_from.as_deref(), Some("bob"));
    }
}
