//! Wire codec for mesh frames.
//!
//! Frames are colon-delimited UTF-8 text carried in one transport payload.
//! The transport does the framing, so there is no length prefix:
//!
//! - text: `messageId:senderName:targetName:body`
//! - edit: `CMD__EDIT:cmdId:targetMessageId:newText`
//! - delete: `CMD__DELETE:cmdId:targetMessageId`
//!
//! Splitting is capped at the number of structural fields so the trailing
//! free-text field keeps any colons it contains. Structural fields never
//! contain the delimiter: ids are UUIDs and nicknames are validated.

use crate::chat::commands::Command;
use crate::chat::types::{CommandId, MessageId, Target};
use crate::error::{Error, Result};

/// Separator between frame fields.
pub const FIELD_DELIMITER: char = ':';

/// Target field value addressing every node.
pub const BROADCAST_TARGET: &str = "ALL";

/// Prefix marking a command frame.
pub const COMMAND_PREFIX: &str = "CMD__";

pub const EDIT_KIND: &str = "EDIT";
pub const DELETE_KIND: &str = "DELETE";

/// Body prefix of the companion frame advertising an out-of-band file.
pub const FILE_NAME_PREFIX: &str = "FILE_NAME:";

/// A message frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFrame {
    pub id: MessageId,
    pub sender_name: String,
    pub target: Target,
    pub body: String,
}

impl TextFrame {
    /// Whether the body only announces a file sent out of band.
    pub fn is_file_announcement(&self) -> bool {
        self.body.starts_with(FILE_NAME_PREFIX)
    }

    /// Advertised file name, for file announcements.
    pub fn announced_file_name(&self) -> Option<&str> {
        self.body.strip_prefix(FILE_NAME_PREFIX)
    }
}

/// One decoded unit of protocol data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(TextFrame),
    Command(Command),
}

impl Frame {
    /// Id used for flood control: the message id or the command id.
    pub fn dedup_id(&self) -> &str {
        match self {
            Frame::Text(text) => text.id.as_str(),
            Frame::Command(cmd) => cmd.command_id().as_str(),
        }
    }

    /// Encode the frame for sending.
    pub fn encode(&self) -> Vec<u8> {
        let text = match self {
            Frame::Text(f) => format!(
                "{}:{}:{}:{}",
                f.id,
                f.sender_name,
                f.target.as_wire(),
                f.body
            ),
            Frame::Command(Command::Edit {
                command_id,
                target,
                new_text,
            }) => format!(
                "{}{}:{}:{}:{}",
                COMMAND_PREFIX, EDIT_KIND, command_id, target, new_text
            ),
            Frame::Command(Command::Delete { command_id, target }) => {
                format!("{}{}:{}:{}", COMMAND_PREFIX, DELETE_KIND, command_id, target)
            }
        };
        text.into_bytes()
    }

    /// Decode a frame from a transport payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| Error::MalformedFrame(format!("not UTF-8: {}", e)))?;

        if let Some(rest) = text.strip_prefix(COMMAND_PREFIX) {
            decode_command(rest).map(Frame::Command)
        } else {
            decode_text(text).map(Frame::Text)
        }
    }
}

fn decode_text(text: &str) -> Result<TextFrame> {
    let mut fields = text.splitn(4, FIELD_DELIMITER);
    let (id, sender, target, body) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(id), Some(sender), Some(target), Some(body)) => (id, sender, target, body),
        _ => {
            return Err(Error::MalformedFrame(
                "text frame needs four fields".to_string(),
            ))
        }
    };

    if id.is_empty() || sender.is_empty() || target.is_empty() {
        return Err(Error::MalformedFrame(
            "text frame has an empty structural field".to_string(),
        ));
    }

    Ok(TextFrame {
        id: MessageId::from(id),
        sender_name: sender.to_string(),
        target: Target::from_wire(target),
        body: body.to_string(),
    })
}

/// Decode the part of a command frame after `CMD__`.
fn decode_command(rest: &str) -> Result<Command> {
    let kind = rest.split(FIELD_DELIMITER).next().unwrap_or_default();

    match kind {
        EDIT_KIND => {
            let mut fields = rest.splitn(4, FIELD_DELIMITER).skip(1);
            match (fields.next(), fields.next(), fields.next()) {
                (Some(cmd), Some(target), Some(new_text)) if !cmd.is_empty() && !target.is_empty() => {
                    Ok(Command::Edit {
                        command_id: CommandId::from(cmd),
                        target: MessageId::from(target),
                        new_text: new_text.to_string(),
                    })
                }
                _ => Err(Error::MalformedFrame(
                    "edit command needs cmdId, targetMessageId and newText".to_string(),
                )),
            }
        }
        DELETE_KIND => {
            let mut fields = rest.splitn(3, FIELD_DELIMITER).skip(1);
            match (fields.next(), fields.next()) {
                (Some(cmd), Some(target)) if !cmd.is_empty() && !target.is_empty() => {
                    Ok(Command::Delete {
                        command_id: CommandId::from(cmd),
                        target: MessageId::from(target),
                    })
                }
                _ => Err(Error::MalformedFrame(
                    "delete command needs cmdId and targetMessageId".to_string(),
                )),
            }
        }
        other => Err(Error::MalformedFrame(format!(
            "unknown command kind: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_str(s: &str) -> Result<Frame> {
        Frame::decode(s.as_bytes())
    }

    #[test]
    fn test_decode_text_frame() {
        let frame = decode_str("m1:alice:ALL:hello there").unwrap();
        match frame {
            Frame::Text(text) => {
                assert_eq!(text.id.as_str(), "m1");
                assert_eq!(text.sender_name, "alice");
                assert_eq!(text.target, Target::All);
                assert_eq!(text.body, "hello there");
            }
            _ => panic!("wrong frame type"),
        }
    }

    #[test]
    fn test_body_keeps_colons() {
        let frame = decode_str("m2:alice:bob:meet at 10:30: bring snacks").unwrap();
        match frame {
            Frame::Text(text) => {
                assert_eq!(text.target, Target::Peer("bob".to_string()));
                assert_eq!(text.body, "meet at 10:30: bring snacks");
            }
            _ => panic!("wrong frame type"),
        }
    }

    #[test]
    fn test_empty_body_is_allowed() {
        let frame = decode_str("m3:alice:ALL:").unwrap();
        assert!(matches!(frame, Frame::Text(ref t) if t.body.is_empty()));
    }

    #[test]
    fn test_decode_edit_keeps_colons_in_new_text() {
        let frame = decode_str("CMD__EDIT:cmd1:msg1:now: with colons").unwrap();
        assert_eq!(
            frame,
            Frame::Command(Command::Edit {
                command_id: "cmd1".into(),
                target: "msg1".into(),
                new_text: "now: with colons".to_string(),
            })
        );
        assert_eq!(frame.dedup_id(), "cmd1");
    }

    #[test]
    fn test_decode_delete() {
        let frame = decode_str("CMD__DELETE:cmd9:msg4").unwrap();
        assert_eq!(
            frame,
            Frame::Command(Command::Delete {
                command_id: "cmd9".into(),
                target: "msg4".into(),
            })
        );
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        for bad in [
            "",
            "justtext",
            "m1:alice:ALL",
            ":alice:ALL:body",
            "m1::ALL:body",
            "CMD__EDIT:cmd1:msg1",
            "CMD__EDIT::msg1:text",
            "CMD__DELETE:cmd1",
            "CMD__DELETE:cmd1:",
            "CMD__PIN:cmd1:msg1",
        ] {
            assert!(
                matches!(decode_str(bad), Err(Error::MalformedFrame(_))),
                "expected {:?} to be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        assert!(matches!(
            Frame::decode(&[0xff, 0xfe, b':']),
            Err(Error::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_encode_matches_wire_layout() {
        let text = Frame::Text(TextFrame {
            id: "m1".into(),
            sender_name: "alice".to_string(),
            target: Target::Peer("bob".to_string()),
            body: "a:b".to_string(),
        });
        assert_eq!(text.encode(), b"m1:alice:bob:a:b".to_vec());

        let edit = Frame::Command(Command::Edit {
            command_id: "c1".into(),
            target: "m1".into(),
            new_text: "x:y".to_string(),
        });
        assert_eq!(edit.encode(), b"CMD__EDIT:c1:m1:x:y".to_vec());

        let delete = Frame::Command(Command::Delete {
            command_id: "c2".into(),
            target: "m1".into(),
        });
        assert_eq!(delete.encode(), b"CMD__DELETE:c2:m1".to_vec());
    }

    #[test]
    fn test_file_announcement() {
        let frame = decode_str("m5:alice:ALL:FILE_NAME:cat.jpg").unwrap();
        match frame {
            Frame::Text(text) => {
                assert!(text.is_file_announcement());
                assert_eq!(text.announced_file_name(), Some("cat.jpg"));
            }
            _ => panic!("wrong frame type"),
        }
    }
}
