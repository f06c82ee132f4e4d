//! In-process transport linking nodes that run in the same process.
//!
//! A [`MemoryMesh`] holds every registered node's handle and the set of
//! links between them. Connecting two nodes reports `NeighborConnected` to
//! both, exactly like a radio link coming up. Frames and files are only
//! delivered across existing links, so multi-hop delivery depends on the
//! nodes' own flooding.
//!
//! ```ignore
//! let mesh = MemoryMesh::new(spool_dir);
//! let alice = mesh.spawn_node(Config::with_nickname("alice"))?;
//! let bob = mesh.spawn_node(Config::with_nickname("bob"))?;
//! mesh.connect(&alice.peer_id, &bob.peer_id);
//! ```

use super::Transport;
use crate::chat::ChatEvent;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::neighbors::PeerId;
use crate::node::{self, MeshNode, NodeEvent, NodeHandle};
use crate::transfer::TransferId;
use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Member {
    name: String,
    handle: NodeHandle,
}

#[derive(Debug, Default)]
struct MeshState {
    members: HashMap<PeerId, Member>,
    /// Undirected links, stored as (smaller, larger).
    links: HashSet<(PeerId, PeerId)>,
}

impl MeshState {
    fn linked(&self, a: &PeerId, b: &PeerId) -> bool {
        self.links.contains(&link_key(a, b))
    }
}

fn link_key(a: &PeerId, b: &PeerId) -> (PeerId, PeerId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Shared switchboard for in-process nodes.
#[derive(Debug, Clone)]
pub struct MemoryMesh {
    state: Arc<Mutex<MeshState>>,
    spool_dir: PathBuf,
}

/// A node started on a [`MemoryMesh`].
pub struct SpawnedNode {
    pub peer_id: PeerId,
    pub handle: NodeHandle,
    pub events: mpsc::UnboundedReceiver<ChatEvent>,
    pub task: JoinHandle<()>,
}

impl MemoryMesh {
    /// Create a mesh that stages file copies under `spool_dir`.
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MeshState::default())),
            spool_dir: spool_dir.into(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MeshState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create the transport for the node known to others as `peer_id`.
    pub fn transport(&self, peer_id: PeerId) -> MemoryTransport {
        MemoryTransport {
            me: peer_id,
            mesh: self.clone(),
        }
    }

    /// Make a running node reachable under `peer_id`.
    pub fn register(&self, peer_id: PeerId, name: String, handle: NodeHandle) {
        self.lock().members.insert(peer_id, Member { name, handle });
    }

    /// Build, start and register a node for `config`.
    pub fn spawn_node(&self, config: Config) -> Result<SpawnedNode> {
        let peer_id = PeerId(format!("mem-{}", uuid::Uuid::new_v4()));
        let name = config.nickname.clone();
        let node = MeshNode::new(config, self.transport(peer_id.clone()))?;
        let (handle, events, task) = node::spawn(node);
        self.register(peer_id.clone(), name, handle.clone());
        Ok(SpawnedNode {
            peer_id,
            handle,
            events,
            task,
        })
    }

    /// Bring up a link between two registered nodes.
    pub fn connect(&self, a: &PeerId, b: &PeerId) -> Result<()> {
        let mut state = self.lock();
        let (a_member, b_member) = match (state.members.get(a), state.members.get(b)) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(Error::Config(format!("cannot link unknown nodes {} and {}", a, b))),
        };

        a_member.handle.notify(NodeEvent::NeighborConnected {
            peer: b.clone(),
            display_name: b_member.name.clone(),
        });
        b_member.handle.notify(NodeEvent::NeighborConnected {
            peer: a.clone(),
            display_name: a_member.name.clone(),
        });
        info!("Linked {} <-> {}", a_member.name, b_member.name);

        state.links.insert(link_key(a, b));
        Ok(())
    }

    /// Tear down a link, notifying both ends.
    pub fn disconnect(&self, a: &PeerId, b: &PeerId) {
        let mut state = self.lock();
        if !state.links.remove(&link_key(a, b)) {
            return;
        }
        if let Some(member) = state.members.get(a) {
            member.handle.notify(NodeEvent::NeighborDisconnected { peer: b.clone() });
        }
        if let Some(member) = state.members.get(b) {
            member.handle.notify(NodeEvent::NeighborDisconnected { peer: a.clone() });
        }
    }

    fn deliver_bytes(&self, from: &PeerId, peers: &[PeerId], payload: &[u8]) {
        let state = self.lock();
        for peer in peers {
            match state.members.get(peer) {
                Some(member) if state.linked(from, peer) => {
                    member.handle.notify(NodeEvent::BytesReceived {
                        from: from.clone(),
                        payload: payload.to_vec(),
                    });
                }
                _ => debug!("Dropping frame from {} to unlinked peer {}", from, peer),
            }
        }
    }

    fn deliver_file(&self, from: &PeerId, peers: &[PeerId], path: &Path) -> Result<TransferId> {
        let transfer_id = TransferId::new();
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::Transfer(format!("not a file: {}", path.display())))?;

        let receivers: Vec<(PeerId, NodeHandle)> = {
            let state = self.lock();
            peers
                .iter()
                .filter(|peer| state.linked(from, peer))
                .filter_map(|peer| {
                    let member = state.members.get(peer)?;
                    Some((peer.clone(), member.handle.clone()))
                })
                .collect()
        };

        for (peer, handle) in receivers {
            // Each receiver gets its own temp copy, as if streamed over its link
            let staged = match self.stage_copy(path, file_name) {
                Ok(staged) => staged,
                Err(e) => {
                    warn!("Could not stage {} for {}: {}", path.display(), peer, e);
                    handle.notify(NodeEvent::TransferFailed {
                        transfer_id: transfer_id.clone(),
                    });
                    continue;
                }
            };

            handle.notify(NodeEvent::FileReceived {
                from: from.clone(),
                transfer_id: transfer_id.clone(),
                path: staged,
            });
            handle.notify(NodeEvent::TransferCompleted {
                transfer_id: transfer_id.clone(),
            });
        }

        Ok(transfer_id)
    }

    fn stage_copy(&self, path: &Path, file_name: &OsStr) -> std::io::Result<PathBuf> {
        let staging = self.spool_dir.join(uuid::Uuid::new_v4().to_string());
        std::fs::create_dir_all(&staging)?;
        let staged = staging.join(file_name);
        std::fs::copy(path, &staged)?;
        Ok(staged)
    }
}

/// One node's view of a [`MemoryMesh`].
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    me: PeerId,
    mesh: MemoryMesh,
}

impl Transport for MemoryTransport {
    fn send_bytes(&self, peers: &[PeerId], payload: &[u8]) {
        self.mesh.deliver_bytes(&self.me, peers, payload);
    }

    fn send_file(&self, peers: &[PeerId], path: &Path) -> Result<TransferId> {
        self.mesh.deliver_file(&self.me, peers, path)
    }
}
