//! Edit and delete commands.
//!
//! A command mutates every copy of its target message, wherever it lives.
//! Replays are filtered upstream by the dedup cache on the command id, so
//! applying here is unconditional. Unknown targets are a no-op: the message
//! may already be gone, or may never have reached this node.

use crate::chat::events::ChatEvent;
use crate::chat::store::ConversationStore;
use crate::chat::types::{CommandId, MessageId};
use tracing::debug;

/// A mutation of an existing message, flooded like a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Edit {
        command_id: CommandId,
        target: MessageId,
        new_text: String,
    },
    Delete {
        command_id: CommandId,
        target: MessageId,
    },
}

impl Command {
    /// Create an edit with a fresh command id.
    pub fn edit(target: MessageId, new_text: String) -> Self {
        Command::Edit {
            command_id: CommandId::new(),
            target,
            new_text,
        }
    }

    /// Create a delete with a fresh command id.
    pub fn delete(target: MessageId) -> Self {
        Command::Delete {
            command_id: CommandId::new(),
            target,
        }
    }

    pub fn command_id(&self) -> &CommandId {
        match self {
            Command::Edit { command_id, .. } | Command::Delete { command_id, .. } => command_id,
        }
    }

    pub fn target(&self) -> &MessageId {
        match self {
            Command::Edit { target, .. } | Command::Delete { target, .. } => target,
        }
    }
}

/// Apply a command to the store, returning the resulting UI events.
pub fn apply_command(store: &mut ConversationStore, command: &Command) -> Vec<ChatEvent> {
    let mut events = Vec::new();

    match command {
        Command::Edit {
            target, new_text, ..
        } => {
            if store.edit_text(target, new_text) > 0 {
                events.push(ChatEvent::MessageEdited {
                    message_id: target.clone(),
                    text: new_text.clone(),
                });
            } else {
                debug!("Edit for unknown message {} ignored", target);
            }
        }
        Command::Delete { target, .. } => {
            if store.remove_by_id(target) > 0 {
                events.push(ChatEvent::MessageRemoved {
                    message_id: target.clone(),
                });
            } else {
                debug!("Delete for unknown message {} ignored", target);
            }
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::Message;

    fn store_with(id: &str) -> ConversationStore {
        let mut store = ConversationStore::new();
        store.append_global(Message::from_incoming(
            id.into(),
            "bob".to_string(),
            "original".to_string(),
        ));
        store
    }

    #[test]
    fn test_edit_replaces_text() {
        let mut store = store_with("msg1");
        let events = apply_command(&mut store, &Command::edit("msg1".into(), "hello".to_string()));
        assert_eq!(events.len(), 1);

        apply_command(&mut store, &Command::edit("msg1".into(), "goodbye".to_string()));
        assert_eq!(store.find_by_id(&"msg1".into()).unwrap().text, "goodbye");
    }

    #[test]
    fn test_delete_removes_message() {
        let mut store = store_with("msg1");
        let events = apply_command(&mut store, &Command::delete("msg1".into()));
        assert!(matches!(&events[0], ChatEvent::MessageRemoved { message_id } if message_id.as_str() == "msg1"));
        assert!(store.find_by_id(&"msg1".into()).is_none());
    }

    #[test]
    fn test_unknown_target_is_noop() {
        let mut store = store_with("msg1");
        assert!(apply_command(&mut store, &Command::edit("nope".into(), "x".to_string())).is_empty());
        assert!(apply_command(&mut store, &Command::delete("nope".into())).is_empty());
        assert_eq!(store.global().len(), 1);
        assert_eq!(store.global()[0].text, "original");
    }

    #[test]
    fn test_fresh_command_ids() {
        let a = Command::delete("m".into());
        let b = Command::delete("m".into());
        assert_ne!(a.command_id(), b.command_id());
        assert_eq!(a.target(), b.target());
    }
}
