//! Transport collaborator seam.
//!
//! The transport owns peer discovery, connection setup and reliable
//! delivery between two directly connected peers. It reports what happens
//! on the links as [`NodeEvent`](crate::node::NodeEvent)s sent to a
//! [`NodeHandle`](crate::node::NodeHandle), and the node calls back into it
//! through [`Transport`] to send. Sends are fire-and-forget: delivery
//! failures stay inside the transport.

pub mod memory;

#[cfg(test)]
pub mod test_support;

use crate::error::Result;
use crate::neighbors::PeerId;
use crate::transfer::TransferId;
use std::path::Path;

pub use memory::{MemoryMesh, MemoryTransport};

/// Outbound half of a link layer.
pub trait Transport: Send + 'static {
    /// Send one frame to each of `peers`.
    fn send_bytes(&self, peers: &[PeerId], payload: &[u8]);

    /// Start sending a file to each of `peers`.
    fn send_file(&self, peers: &[PeerId], path: &Path) -> Result<TransferId>;
}
