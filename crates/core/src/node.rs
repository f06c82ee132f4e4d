//! The mesh node: flood propagation and the event loop around it.
//!
//! [`MeshNode`] owns all mutable state (neighbor table, dedup cache,
//! conversation store, transfer correlator) and is driven one
//! [`NodeEvent`] at a time. [`spawn`] runs it as a single tokio task fed by
//! an unbounded channel, so inbound frames from different neighbors and
//! local user actions are serialized without locks.
//!
//! Per inbound frame: decode, drop if malformed, drop if the id was already
//! seen, otherwise mark it seen, forward the unchanged bytes to every
//! neighbor except the one it came from, then apply it locally. Forwarding
//! happens for every novel frame, including private messages for other
//! nodes and commands, since there is no routing table.

use crate::chat::codec::{Frame, TextFrame, FILE_NAME_PREFIX};
use crate::chat::commands::{apply_command, Command};
use crate::chat::events::ChatEvent;
use crate::chat::store::ConversationStore;
use crate::chat::types::{ConversationKey, Message, MessageId, MessageKind, Target};
use crate::config::{Config, PrivatePolicy};
use crate::dedup::DedupCache;
use crate::error::{Error, Result};
use crate::neighbors::{validate_nickname, Identity, NeighborInfo, NeighborTable, PeerId};
use crate::transfer::{TransferCorrelator, TransferId};
use crate::transport::Transport;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything that can happen to a node.
#[derive(Debug)]
pub enum NodeEvent {
    // ==================== From the transport ====================
    NeighborConnected {
        peer: PeerId,
        display_name: String,
    },
    NeighborDisconnected {
        peer: PeerId,
    },
    BytesReceived {
        from: PeerId,
        payload: Vec<u8>,
    },
    FileReceived {
        from: PeerId,
        transfer_id: TransferId,
        path: PathBuf,
    },
    TransferCompleted {
        transfer_id: TransferId,
    },
    TransferFailed {
        transfer_id: TransferId,
    },

    // ==================== From the UI ====================
    SendText {
        target: Target,
        body: String,
        reply: oneshot::Sender<Result<MessageId>>,
    },
    SendFile {
        target: Target,
        path: PathBuf,
        reply: oneshot::Sender<Result<MessageId>>,
    },
    Edit {
        id: MessageId,
        new_text: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Delete {
        id: MessageId,
        local_only: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Open a partner's conversation, or the global log for `None`.
    OpenConversation {
        partner: Option<String>,
        reply: oneshot::Sender<Result<Vec<Message>>>,
    },
    Snapshot {
        reply: oneshot::Sender<NodeSnapshot>,
    },
    Shutdown,
}

/// Read-only copy of a node's state for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub nickname: String,
    pub neighbors: Vec<NeighborInfo>,
    pub global: Vec<Message>,
    pub private: BTreeMap<String, Vec<Message>>,
    pub unread: BTreeMap<String, u32>,
    pub active_partner: Option<String>,
}

impl NodeSnapshot {
    pub fn unread_count(&self, partner: &str) -> u32 {
        self.unread.get(partner).copied().unwrap_or(0)
    }

    pub fn private_log(&self, partner: &str) -> &[Message] {
        self.private.get(partner).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// A mesh chat node.
pub struct MeshNode<T: Transport> {
    identity: Identity,
    private_policy: PrivatePolicy,
    max_message_length: usize,
    neighbors: NeighborTable,
    dedup: DedupCache,
    store: ConversationStore,
    transfers: TransferCorrelator,
    transport: T,
    events: Vec<ChatEvent>,
}

impl<T: Transport> MeshNode<T> {
    /// Create a node from a validated configuration.
    pub fn new(config: Config, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            identity: Identity::new(config.nickname)?,
            private_policy: config.private_policy,
            max_message_length: config.max_message_length,
            neighbors: NeighborTable::new(),
            dedup: DedupCache::new(config.dedup_capacity),
            store: ConversationStore::new(),
            transfers: TransferCorrelator::new(config.received_dir),
            transport,
            events: Vec::new(),
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn dedup(&self) -> &DedupCache {
        &self.dedup
    }

    /// Take the UI events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<ChatEvent> {
        std::mem::take(&mut self.events)
    }

    /// Dispatch one event. Returns false once the node should stop.
    pub fn handle(&mut self, event: NodeEvent) -> bool {
        match event {
            NodeEvent::NeighborConnected { peer, display_name } => {
                self.on_neighbor_connected(peer, display_name)
            }
            NodeEvent::NeighborDisconnected { peer } => self.on_neighbor_disconnected(&peer),
            NodeEvent::BytesReceived { from, payload } => self.on_bytes_received(&from, &payload),
            NodeEvent::FileReceived {
                from,
                transfer_id,
                path,
            } => self.on_file_received(&from, transfer_id, path),
            NodeEvent::TransferCompleted { transfer_id } => self.on_transfer_completed(&transfer_id),
            NodeEvent::TransferFailed { transfer_id } => self.on_transfer_failed(&transfer_id),
            NodeEvent::SendText {
                target,
                body,
                reply,
            } => {
                let _ = reply.send(self.send_text(target, body));
            }
            NodeEvent::SendFile {
                target,
                path,
                reply,
            } => {
                let _ = reply.send(self.send_file(target, &path));
            }
            NodeEvent::Edit {
                id,
                new_text,
                reply,
            } => {
                let _ = reply.send(self.edit_message(&id, new_text));
            }
            NodeEvent::Delete {
                id,
                local_only,
                reply,
            } => {
                let _ = reply.send(self.delete_message(&id, local_only));
            }
            NodeEvent::OpenConversation { partner, reply } => {
                let log = match partner {
                    Some(partner) => self.open_conversation(&partner),
                    None => Ok(self.open_global()),
                };
                let _ = reply.send(log);
            }
            NodeEvent::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            NodeEvent::Shutdown => return false,
        }
        true
    }

    // ==================== Neighbor events ====================

    pub fn on_neighbor_connected(&mut self, peer: PeerId, display_name: String) {
        if self.neighbors.insert(peer.clone(), display_name) {
            if let Some(info) = self.neighbors.get(&peer) {
                info!(
                    "Neighbor {} connected ({} total)",
                    info.display_name,
                    self.neighbors.len()
                );
                self.events.push(ChatEvent::NeighborConnected {
                    neighbor: info.clone(),
                });
            }
        }
    }

    pub fn on_neighbor_disconnected(&mut self, peer: &PeerId) {
        if let Some(info) = self.neighbors.remove(peer) {
            info!(
                "Neighbor {} disconnected ({} left)",
                info.display_name,
                self.neighbors.len()
            );
            let dropped = self.transfers.forget_peer(peer);
            if dropped > 0 {
                debug!("Dropped {} unfinished transfers from {}", dropped, info.display_name);
            }
            self.events.push(ChatEvent::NeighborDisconnected { neighbor: info });
        }
    }

    // ==================== Inbound frames ====================

    /// Run one inbound frame through dedup, forwarding and local apply.
    pub fn on_bytes_received(&mut self, from: &PeerId, payload: &[u8]) {
        let frame = match Frame::decode(payload) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Dropping frame from {}: {}", from, e);
                return;
            }
        };

        if !self.dedup.check_and_mark(frame.dedup_id()) {
            debug!("Duplicate {} from {}", frame.dedup_id(), from);
            return;
        }

        self.forward(from, payload);

        match frame {
            Frame::Text(text) => self.apply_text(text),
            Frame::Command(command) => {
                let events = apply_command(&mut self.store, &command);
                self.events.extend(events);
            }
        }
    }

    /// Relay unchanged bytes to every neighbor except the origin.
    fn forward(&self, from: &PeerId, payload: &[u8]) {
        let targets = self.neighbors.ids_except(from);
        if !targets.is_empty() {
            self.transport.send_bytes(&targets, payload);
        }
    }

    /// Send bytes to every current neighbor.
    fn broadcast(&self, payload: &[u8]) {
        let targets = self.neighbors.ids();
        if targets.is_empty() {
            debug!("No neighbors connected, frame recorded locally only");
            return;
        }
        self.transport.send_bytes(&targets, payload);
    }

    fn apply_text(&mut self, frame: TextFrame) {
        if frame.is_file_announcement() {
            debug!(
                "{} announced file {:?}",
                frame.sender_name,
                frame.announced_file_name()
            );
            return;
        }

        match &frame.target {
            Target::All => {
                let message = Message::from_incoming(frame.id, frame.sender_name, frame.body);
                self.store.append_global(message.clone());
                self.events.push(ChatEvent::MessageAdded {
                    conversation: ConversationKey::Global,
                    message,
                });
            }
            Target::Peer(name) if self.identity.is_addressed_to_me(name) => {
                let partner = frame.sender_name.clone();
                let message = Message::from_incoming(frame.id, frame.sender_name, frame.body);
                self.receive_private(partner, message);
            }
            Target::Peer(name) => {
                debug!("Relayed private message for {} without storing it", name);
            }
        }
    }

    fn receive_private(&mut self, partner: String, message: Message) {
        self.store.append_private(&partner, message.clone());
        self.events.push(ChatEvent::MessageAdded {
            conversation: ConversationKey::Private(partner.clone()),
            message: message.clone(),
        });

        if self.store.is_open(&partner) {
            return;
        }

        let count = self.store.increment_unread(&partner);
        self.events.push(ChatEvent::UnreadChanged {
            partner: partner.clone(),
            count,
        });

        if self.private_policy == PrivatePolicy::MirrorToGlobal {
            let mirror = message.mirrored_from(&partner);
            self.store.append_global(mirror.clone());
            self.events.push(ChatEvent::MessageAdded {
                conversation: ConversationKey::Global,
                message: mirror,
            });
        }
    }

    // ==================== File transfers ====================

    pub fn on_file_received(&mut self, from: &PeerId, transfer_id: TransferId, path: PathBuf) {
        let sender_name = self
            .neighbors
            .display_name(from)
            .unwrap_or(from.as_str())
            .to_string();
        self.transfers.record(transfer_id, from.clone(), sender_name, path);
    }

    pub fn on_transfer_completed(&mut self, transfer_id: &TransferId) {
        match self.transfers.complete(transfer_id) {
            Ok(Some(done)) => {
                let text = done
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| done.id.to_string());
                let message = Message::system(done.sender_name, text, done.path);
                let key = self.store.active_key();
                self.store.append(&key, message.clone());
                self.events.push(ChatEvent::MessageAdded {
                    conversation: key,
                    message,
                });
            }
            Ok(None) => debug!("Completion for untracked transfer {}", transfer_id),
            Err(e) => warn!("Transfer {} could not be stored: {}", transfer_id, e),
        }
    }

    pub fn on_transfer_failed(&mut self, transfer_id: &TransferId) {
        if let Some(transfer) = self.transfers.fail(transfer_id) {
            let elapsed = chrono::Utc::now() - transfer.started_at;
            warn!(
                "Transfer {} from {} failed after {}s",
                transfer_id,
                transfer.sender_name,
                elapsed.num_seconds()
            );
        }
    }

    // ==================== User operations ====================

    fn validate_body(&self, body: &str) -> Result<()> {
        if body.is_empty() {
            return Err(Error::EmptyMessage);
        }
        if body.len() > self.max_message_length {
            return Err(Error::MessageTooLong {
                len: body.len(),
                max: self.max_message_length,
            });
        }
        Ok(())
    }

    fn validate_target(target: &Target) -> Result<()> {
        match target {
            Target::All => Ok(()),
            Target::Peer(name) => validate_nickname(name),
        }
    }

    /// Record a message we authored and flood its frame.
    fn originate(&mut self, target: Target, message: Message, body: String) -> MessageId {
        let id = message.id.clone();
        self.dedup.mark_seen(id.as_str());

        let key = ConversationKey::from(&target);
        self.store.append(&key, message.clone());
        self.events.push(ChatEvent::MessageAdded {
            conversation: key,
            message,
        });

        let frame = Frame::Text(TextFrame {
            id: id.clone(),
            sender_name: self.identity.nickname().to_string(),
            target,
            body,
        });
        self.broadcast(&frame.encode());
        id
    }

    /// Send a text message to everyone or to one partner.
    pub fn send_text(&mut self, target: Target, body: String) -> Result<MessageId> {
        self.validate_body(&body)?;
        Self::validate_target(&target)?;
        if body.starts_with(FILE_NAME_PREFIX) {
            return Err(Error::ReservedPrefix(FILE_NAME_PREFIX));
        }

        let message = Message::new_outgoing(self.identity.nickname().to_string(), body.clone());
        Ok(self.originate(target, message, body))
    }

    /// Announce a file, send it to every neighbor and record it locally.
    ///
    /// If the transport refuses the file, the local entry is withdrawn and
    /// the error returned. The announcement has already flooded by then,
    /// which is harmless since announcements are never rendered.
    pub fn send_file(&mut self, target: Target, path: &Path) -> Result<MessageId> {
        Self::validate_target(&target)?;
        if !path.is_file() {
            return Err(Error::Transfer(format!("not a file: {}", path.display())));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Transfer(format!("no file name: {}", path.display())))?;

        let mut message = Message::new_outgoing(self.identity.nickname().to_string(), file_name.clone());
        message.kind = MessageKind::Photo;
        message.attachment = Some(path.to_path_buf());

        let announcement = format!("{}{}", FILE_NAME_PREFIX, file_name);
        let id = self.originate(target, message, announcement);

        let targets = self.neighbors.ids();
        if targets.is_empty() {
            return Ok(id);
        }
        match self.transport.send_file(&targets, path) {
            Ok(transfer_id) => {
                debug!("Sending {} as transfer {}", file_name, transfer_id);
                Ok(id)
            }
            Err(e) => {
                warn!("Failed to send {}: {}", file_name, e);
                self.store.remove_by_id(&id);
                self.events.push(ChatEvent::MessageRemoved { message_id: id });
                Err(Error::Transfer(format!("failed to send {}: {}", file_name, e)))
            }
        }
    }

    /// Edit one of our own messages everywhere.
    pub fn edit_message(&mut self, id: &MessageId, new_text: String) -> Result<()> {
        self.validate_body(&new_text)?;
        let message = self
            .store
            .find_by_id(id)
            .ok_or_else(|| Error::MessageNotFound(id.to_string()))?;
        if !message.is_mine {
            return Err(Error::NotOwnMessage(id.to_string()));
        }

        self.issue_command(Command::edit(id.clone(), new_text));
        Ok(())
    }

    /// Delete a message.
    ///
    /// Our own messages are deleted mesh-wide unless `local_only` is set.
    /// Other nodes' messages are only ever removed from this node's view.
    pub fn delete_message(&mut self, id: &MessageId, local_only: bool) -> Result<()> {
        let message = self
            .store
            .find_by_id(id)
            .ok_or_else(|| Error::MessageNotFound(id.to_string()))?;

        if local_only || !message.is_mine {
            self.store.remove_by_id(id);
            self.events.push(ChatEvent::MessageRemoved {
                message_id: id.clone(),
            });
            return Ok(());
        }

        self.issue_command(Command::delete(id.clone()));
        Ok(())
    }

    /// Apply a locally created command, then flood it.
    fn issue_command(&mut self, command: Command) {
        debug!("Issuing command {} for {}", command.command_id(), command.target());
        let events = apply_command(&mut self.store, &command);
        self.events.extend(events);
        self.dedup.mark_seen(command.command_id().as_str());
        self.broadcast(&Frame::Command(command).encode());
    }

    /// Open a partner's conversation, clearing its unread count.
    ///
    /// The partner must be a nickname that could address us, so `ALL`,
    /// names containing the field delimiter and our own name are refused.
    pub fn open_conversation(&mut self, partner: &str) -> Result<Vec<Message>> {
        validate_nickname(partner)?;
        if self.identity.is_addressed_to_me(partner) {
            return Err(Error::InvalidNickname(format!(
                "cannot open a conversation with yourself ({})",
                partner
            )));
        }

        let had_unread = self.store.unread_count(partner) > 0;
        let log = self.store.open_conversation(partner).to_vec();
        if had_unread {
            self.events.push(ChatEvent::UnreadChanged {
                partner: partner.to_string(),
                count: 0,
            });
        }
        Ok(log)
    }

    /// Return to the global log.
    pub fn open_global(&mut self) -> Vec<Message> {
        self.store.open_global().to_vec()
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            nickname: self.identity.nickname().to_string(),
            neighbors: self.neighbors.list(),
            global: self.store.global().to_vec(),
            private: self.store.private_logs(),
            unread: self.store.unread_counts(),
            active_partner: self.store.active_partner().map(str::to_string),
        }
    }
}

/// Cloneable entry point into a running node.
///
/// The transport uses [`NodeHandle::notify`]; the UI uses the async
/// request methods, which resolve once the node has processed them.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    tx: mpsc::UnboundedSender<NodeEvent>,
}

impl NodeHandle {
    /// Queue an event without waiting. Dropped if the node has stopped.
    pub fn notify(&self, event: NodeEvent) {
        if self.tx.send(event).is_err() {
            debug!("Node stopped, event dropped");
        }
    }

    async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> NodeEvent) -> Result<R> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).map_err(|_| Error::NodeStopped)?;
        rx.await.map_err(|_| Error::NodeStopped)
    }

    pub async fn send_text(&self, target: Target, body: impl Into<String>) -> Result<MessageId> {
        let body = body.into();
        self.request(|reply| NodeEvent::SendText {
            target,
            body,
            reply,
        })
        .await?
    }

    pub async fn send_file(&self, target: Target, path: impl Into<PathBuf>) -> Result<MessageId> {
        let path = path.into();
        self.request(|reply| NodeEvent::SendFile {
            target,
            path,
            reply,
        })
        .await?
    }

    pub async fn edit_message(&self, id: MessageId, new_text: impl Into<String>) -> Result<()> {
        let new_text = new_text.into();
        self.request(|reply| NodeEvent::Edit {
            id,
            new_text,
            reply,
        })
        .await?
    }

    pub async fn delete_message(&self, id: MessageId, local_only: bool) -> Result<()> {
        self.request(|reply| NodeEvent::Delete {
            id,
            local_only,
            reply,
        })
        .await?
    }

    pub async fn open_conversation(&self, partner: impl Into<String>) -> Result<Vec<Message>> {
        let partner = Some(partner.into());
        self.request(|reply| NodeEvent::OpenConversation { partner, reply })
            .await?
    }

    pub async fn open_global(&self) -> Result<Vec<Message>> {
        self.request(|reply| NodeEvent::OpenConversation {
            partner: None,
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<NodeSnapshot> {
        self.request(|reply| NodeEvent::Snapshot { reply }).await
    }

    pub fn shutdown(&self) {
        self.notify(NodeEvent::Shutdown);
    }
}

/// Start a node's event loop on the current tokio runtime.
///
/// Returns the handle, the stream of UI events and the loop's task.
pub fn spawn<T: Transport>(
    node: MeshNode<T>,
) -> (NodeHandle, mpsc::UnboundedReceiver<ChatEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (ui_tx, ui_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(node, rx, ui_tx));
    (NodeHandle { tx }, ui_rx, task)
}

async fn run<T: Transport>(
    mut node: MeshNode<T>,
    mut rx: mpsc::UnboundedReceiver<NodeEvent>,
    ui_tx: mpsc::UnboundedSender<ChatEvent>,
) {
    debug!("Node {} started", node.identity().nickname());
    while let Some(event) = rx.recv().await {
        let keep_running = node.handle(event);
        for ui_event in node.drain_events() {
            // The UI may have gone away; the node keeps relaying regardless
            let _ = ui_tx.send(ui_event);
        }
        if !keep_running {
            break;
        }
    }
    debug!("Node {} stopped", node.identity().nickname());
}
