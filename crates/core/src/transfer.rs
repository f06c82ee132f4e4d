//! Correlation of incoming file transfers with chat entries.
//!
//! The transport announces a file as soon as its payload starts arriving
//! (with a temporary handle) and reports completion later by transfer id.
//! Nothing in the file payload names a conversation, so the node files the
//! finished transfer under whichever conversation is open at completion.

use crate::error::{Error, Result};
use crate::neighbors::PeerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Unique identifier for a transfer, assigned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferId(pub String);

impl TransferId {
    /// Generate a new random transfer ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TransferId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A file that has started arriving from a neighbor.
#[derive(Debug, Clone)]
pub struct IncomingTransfer {
    pub id: TransferId,
    pub from: PeerId,
    /// Display name of the neighbor at the time the file arrived.
    pub sender_name: String,
    /// Temporary handle provided by the transport.
    pub temp_path: PathBuf,
    pub started_at: DateTime<Utc>,
}

/// A transfer whose file has been moved to permanent storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTransfer {
    pub id: TransferId,
    pub sender_name: String,
    pub path: PathBuf,
}

/// Tracks in-flight incoming transfers until they complete or fail.
#[derive(Debug)]
pub struct TransferCorrelator {
    pending: HashMap<TransferId, IncomingTransfer>,
    received_dir: PathBuf,
}

impl TransferCorrelator {
    /// Create a correlator that moves finished files into `received_dir`.
    pub fn new(received_dir: PathBuf) -> Self {
        Self {
            pending: HashMap::new(),
            received_dir,
        }
    }

    /// Remember an incoming file until its transfer completes.
    pub fn record(&mut self, id: TransferId, from: PeerId, sender_name: String, temp_path: PathBuf) {
        debug!("Tracking incoming transfer {} from {}", id, sender_name);
        self.pending.insert(
            id.clone(),
            IncomingTransfer {
                id,
                from,
                sender_name,
                temp_path,
                started_at: Utc::now(),
            },
        );
    }

    /// Finish a transfer by moving its file to permanent storage.
    ///
    /// Returns `Ok(None)` for ids that were never recorded here, such as
    /// our own outgoing transfers. The entry is dropped even on failure;
    /// transfers are not retried.
    pub fn complete(&mut self, id: &TransferId) -> Result<Option<CompletedTransfer>> {
        let Some(transfer) = self.pending.remove(id) else {
            return Ok(None);
        };

        let file_name = transfer
            .temp_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let dest = self.received_dir.join(format!("{}_{}", transfer.id, file_name));

        move_file(&transfer.temp_path, &dest).map_err(|e| {
            Error::Transfer(format!(
                "failed to move {} to {}: {}",
                transfer.temp_path.display(),
                dest.display(),
                e
            ))
        })?;

        Ok(Some(CompletedTransfer {
            id: transfer.id,
            sender_name: transfer.sender_name,
            path: dest,
        }))
    }

    /// Forget a failed transfer and discard its temporary file.
    pub fn fail(&mut self, id: &TransferId) -> Option<IncomingTransfer> {
        let transfer = self.pending.remove(id)?;
        discard_temp_file(&transfer);
        Some(transfer)
    }

    /// Drop every transfer coming from a neighbor that went away,
    /// discarding their partial files.
    pub fn forget_peer(&mut self, peer: &PeerId) -> usize {
        let ids: Vec<TransferId> = self
            .pending
            .values()
            .filter(|t| &t.from == peer)
            .map(|t| t.id.clone())
            .collect();
        for id in &ids {
            if let Some(transfer) = self.pending.remove(id) {
                discard_temp_file(&transfer);
            }
        }
        ids.len()
    }

    pub fn get(&self, id: &TransferId) -> Option<&IncomingTransfer> {
        self.pending.get(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn discard_temp_file(transfer: &IncomingTransfer) {
    if let Err(e) = std::fs::remove_file(&transfer.temp_path) {
        debug!(
            "Could not remove temp file {}: {}",
            transfer.temp_path.display(),
            e
        );
    }
}

/// Rename, falling back to copy + delete across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    if let Err(e) = std::fs::remove_file(from) {
        warn!("Copied {} but could not remove it: {}", from.display(), e);
    }
    Ok(())
}
