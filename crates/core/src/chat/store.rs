//! In-memory conversation storage.
//!
//! Structure:
//! - `global`: the broadcast log
//! - `private`: partner display name -> that conversation's log
//! - `unread`: partner display name -> unread count
//! - `active`: the partner whose conversation is open (None = global)
//!
//! Logs live for the session only. Message ids are unique mesh-wide, but
//! the same id may appear in several logs (a private message mirrored into
//! the global log), so lookups and mutations scan every log.

use crate::chat::types::{ConversationKey, Message, MessageId};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct ConversationStore {
    global: Vec<Message>,
    private: HashMap<String, Vec<Message>>,
    unread: HashMap<String, u32>,
    active: Option<String>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Append ====================

    /// Append to the broadcast log.
    pub fn append_global(&mut self, msg: Message) {
        self.global.push(msg);
    }

    /// Append to a partner's log, creating the log if needed.
    pub fn append_private(&mut self, partner: &str, msg: Message) {
        self.private.entry(partner.to_string()).or_default().push(msg);
    }

    /// Append to whichever log `key` names.
    pub fn append(&mut self, key: &ConversationKey, msg: Message) {
        match key {
            ConversationKey::Global => self.append_global(msg),
            ConversationKey::Private(partner) => self.append_private(partner, msg),
        }
    }

    // ==================== Lookup and mutation by id ====================

    fn logs(&self) -> impl Iterator<Item = &Vec<Message>> {
        std::iter::once(&self.global).chain(self.private.values())
    }

    fn logs_mut(&mut self) -> impl Iterator<Item = &mut Vec<Message>> {
        std::iter::once(&mut self.global).chain(self.private.values_mut())
    }

    /// Find a message in any log.
    pub fn find_by_id(&self, id: &MessageId) -> Option<&Message> {
        self.logs().flat_map(|log| log.iter()).find(|m| &m.id == id)
    }

    /// Replace the text of every copy of a message. Returns how many
    /// copies were changed.
    pub fn edit_text(&mut self, id: &MessageId, new_text: &str) -> usize {
        let mut edited = 0;
        for msg in self.logs_mut().flat_map(|log| log.iter_mut()) {
            if &msg.id == id {
                msg.text = new_text.to_string();
                edited += 1;
            }
        }
        edited
    }

    /// Remove every copy of a message. Returns how many were removed.
    pub fn remove_by_id(&mut self, id: &MessageId) -> usize {
        let mut removed = 0;
        for log in self.logs_mut() {
            let before = log.len();
            log.retain(|m| &m.id != id);
            removed += before - log.len();
        }
        removed
    }

    // ==================== Unread accounting ====================

    /// Bump the unread count for a partner and return the new value.
    pub fn increment_unread(&mut self, partner: &str) -> u32 {
        let count = self.unread.entry(partner.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn clear_unread(&mut self, partner: &str) {
        self.unread.remove(partner);
    }

    pub fn unread_count(&self, partner: &str) -> u32 {
        self.unread.get(partner).copied().unwrap_or(0)
    }

    /// Non-zero unread counts, ordered by partner name.
    pub fn unread_counts(&self) -> BTreeMap<String, u32> {
        self.unread
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, count)| (name.clone(), *count))
            .collect()
    }

    // ==================== Conversations ====================

    /// Make `partner` the open conversation, clear its unread count and
    /// return its log.
    pub fn open_conversation(&mut self, partner: &str) -> &[Message] {
        self.active = Some(partner.to_string());
        self.clear_unread(partner);
        self.private.entry(partner.to_string()).or_default()
    }

    /// Switch back to the global log.
    pub fn open_global(&mut self) -> &[Message] {
        self.active = None;
        &self.global
    }

    /// Partner whose conversation is open, if any.
    pub fn active_partner(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_open(&self, partner: &str) -> bool {
        self.active.as_deref() == Some(partner)
    }

    /// Key of the log currently on screen.
    pub fn active_key(&self) -> ConversationKey {
        match &self.active {
            Some(partner) => ConversationKey::Private(partner.clone()),
            None => ConversationKey::Global,
        }
    }

    pub fn global(&self) -> &[Message] {
        &self.global
    }

    pub fn private_log(&self, partner: &str) -> Option<&[Message]> {
        self.private.get(partner).map(|log| log.as_slice())
    }

    /// Partners with a private log, sorted by name.
    pub fn partners(&self) -> Vec<String> {
        let mut partners: Vec<_> = self.private.keys().cloned().collect();
        partners.sort();
        partners
    }

    /// Copy of every private log, ordered by partner name.
    pub fn private_logs(&self) -> BTreeMap<String, Vec<Message>> {
        self.private
            .iter()
            .map(|(name, log)| (name.clone(), log.clone()))
            .collect()
    }
}
