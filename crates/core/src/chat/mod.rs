//! Chat state for the mesh.
//!
//! - Colon-delimited wire frames for messages and commands
//! - A global log plus one log per private partner
//! - Unread counters per partner
//! - Edit/delete commands applied across every log

pub mod codec;
pub mod commands;
pub mod events;
pub mod store;
pub mod types;

pub use codec::{Frame, TextFrame};
pub use commands::{apply_command, Command};
pub use events::ChatEvent;
pub use store::ConversationStore;
pub use types::*;
