//! Meshtalk Core Library
//!
//! This crate provides the message propagation and conversation engine for
//! a serverless local mesh chat, including:
//! - Wire codec for text and edit/delete command frames
//! - Bounded duplicate suppression for flooded frames
//! - Flood forwarding to every neighbor except the origin
//! - Global and per-partner conversation logs with unread counts
//! - Correlation of incoming file transfers with chat entries
//!
//! Radio links are abstracted behind the [`Transport`] trait; an in-process
//! implementation lives in [`transport::memory`].

pub mod chat;
pub mod config;
pub mod dedup;
pub mod error;
pub mod neighbors;
pub mod node;
pub mod platform;
pub mod transfer;
pub mod transport;

// Re-export commonly used types
pub use chat::{ChatEvent, ConversationKey, Message, MessageId, MessageKind, Target};
pub use config::{Config, PrivatePolicy};
pub use error::{Error, Result};
pub use neighbors::{NeighborInfo, PeerId};
pub use node::{spawn, MeshNode, NodeEvent, NodeHandle, NodeSnapshot};
pub use transfer::TransferId;
pub use transport::{MemoryMesh, MemoryTransport, Transport};
