//! Local identity and the table of directly connected neighbors.
//!
//! Neighbors are peers one hop away. Entries are created when the transport
//! reports an accepted connection and removed on disconnect; nothing here is
//! persisted. The table is the snapshot source for flood forwarding.

use crate::chat::codec::{BROADCAST_TARGET, FIELD_DELIMITER};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque identifier for a direct connection.
///
/// Stable only while the connection lives; used as a forwarding-exclusion
/// key and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl PeerId {
    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Check that a display name can travel in a frame's structural fields.
pub fn validate_nickname(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidNickname("nickname cannot be empty".to_string()));
    }
    if name.contains(FIELD_DELIMITER) {
        return Err(Error::InvalidNickname(format!(
            "nickname cannot contain '{}'",
            FIELD_DELIMITER
        )));
    }
    if name == BROADCAST_TARGET {
        return Err(Error::InvalidNickname(format!(
            "{} is reserved for broadcast",
            BROADCAST_TARGET
        )));
    }
    Ok(())
}

/// This node's identity on the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    nickname: String,
}

impl Identity {
    /// Create an identity after validating the nickname.
    pub fn new(nickname: impl Into<String>) -> Result<Self> {
        let nickname = nickname.into();
        validate_nickname(&nickname)?;
        Ok(Self { nickname })
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Whether a frame's target field addresses this node.
    pub fn is_addressed_to_me(&self, target: &str) -> bool {
        self.nickname == target
    }
}

/// A directly connected neighbor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NeighborInfo {
    pub peer_id: PeerId,
    /// Name the neighbor advertised when connecting.
    pub display_name: String,
    pub connected_at: DateTime<Utc>,
}

/// Live set of neighbors, keyed by connection id.
#[derive(Debug, Default)]
pub struct NeighborTable {
    neighbors: HashMap<PeerId, NeighborInfo>,
}

impl NeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted connection. Returns true if the peer was not
    /// already present.
    pub fn insert(&mut self, peer_id: PeerId, display_name: String) -> bool {
        let info = NeighborInfo {
            peer_id: peer_id.clone(),
            display_name,
            connected_at: Utc::now(),
        };
        self.neighbors.insert(peer_id, info).is_none()
    }

    /// Forget a neighbor after disconnect.
    pub fn remove(&mut self, peer_id: &PeerId) -> Option<NeighborInfo> {
        self.neighbors.remove(peer_id)
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&NeighborInfo> {
        self.neighbors.get(peer_id)
    }

    /// Display name advertised by a neighbor, if it is connected.
    pub fn display_name(&self, peer_id: &PeerId) -> Option<&str> {
        self.neighbors.get(peer_id).map(|n| n.display_name.as_str())
    }

    /// All connected neighbor ids.
    pub fn ids(&self) -> Vec<PeerId> {
        self.neighbors.keys().cloned().collect()
    }

    /// Connected neighbor ids other than `excluded`.
    pub fn ids_except(&self, excluded: &PeerId) -> Vec<PeerId> {
        self.neighbors
            .keys()
            .filter(|id| *id != excluded)
            .cloned()
            .collect()
    }

    /// Neighbors sorted by display name, for presentation.
    pub fn list(&self) -> Vec<NeighborInfo> {
        let mut list: Vec<_> = self.neighbors.values().cloned().collect();
        list.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.peer_id.cmp(&b.peer_id))
        });
        list
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}
