//! Notifications emitted to the UI collaborator.

use crate::chat::types::{ConversationKey, Message, MessageId};
use crate::neighbors::NeighborInfo;

/// Events emitted by chat operations for UI notification.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A message was appended to a log.
    MessageAdded {
        conversation: ConversationKey,
        message: Message,
    },
    /// A message's text was replaced.
    MessageEdited { message_id: MessageId, text: String },
    /// A message was removed from every log holding it.
    MessageRemoved { message_id: MessageId },
    /// A partner's unread count changed.
    UnreadChanged { partner: String, count: u32 },
    NeighborConnected { neighbor: NeighborInfo },
    NeighborDisconnected { neighbor: NeighborInfo },
}
