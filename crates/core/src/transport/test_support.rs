//! Test support for driving a single node without a mesh.

use super::Transport;
use crate::error::{Error, Result};
use crate::neighbors::PeerId;
use crate::transfer::TransferId;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One `send_bytes` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub peers: Vec<PeerId>,
    pub payload: Vec<u8>,
}

/// Transport that records what the node asked it to send.
///
/// Clones share the same log, so a test keeps one clone and moves the
/// other into the node.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    frames: Arc<Mutex<Vec<SentFrame>>>,
    files: Arc<Mutex<Vec<(Vec<PeerId>, PathBuf)>>>,
    refuse_files: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sent so far, with peer lists sorted.
    pub fn frames(&self) -> Vec<SentFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn files(&self) -> Vec<(Vec<PeerId>, PathBuf)> {
        self.files.lock().unwrap().clone()
    }

    /// Make every later `send_file` fail.
    pub fn refuse_files(&self) {
        self.refuse_files.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.frames.lock().unwrap().clear();
        self.files.lock().unwrap().clear();
    }
}

impl Transport for RecordingTransport {
    fn send_bytes(&self, peers: &[PeerId], payload: &[u8]) {
        let mut peers = peers.to_vec();
        peers.sort();
        self.frames.lock().unwrap().push(SentFrame {
            peers,
            payload: payload.to_vec(),
        });
    }

    fn send_file(&self, peers: &[PeerId], path: &Path) -> Result<TransferId> {
        if self.refuse_files.load(Ordering::SeqCst) {
            return Err(Error::Transfer(format!("refused {}", path.display())));
        }
        let mut peers = peers.to_vec();
        peers.sort();
        self.files.lock().unwrap().push((peers, path.to_path_buf()));
        Ok(TransferId::new())
    }
}
