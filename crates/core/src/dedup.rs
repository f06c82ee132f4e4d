//! Bounded cache of already-processed message and command ids.
//!
//! Flooding delivers the same frame once per path, so every node must
//! remember what it has handled. Ids are kept in insertion order and the
//! oldest is evicted once `capacity` is reached; a lookup does not refresh
//! an entry. Message ids and command ids share one namespace.

use lru::LruCache;
use std::num::NonZeroUsize;

/// Fixed-capacity set of seen ids with oldest-first eviction.
pub struct DedupCache {
    seen: LruCache<String, ()>,
}

impl DedupCache {
    /// Create a cache holding at most `capacity` ids (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            seen: LruCache::new(capacity),
        }
    }

    /// Whether the id has been processed (and not yet evicted).
    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Record an id as processed.
    pub fn mark_seen(&mut self, id: &str) {
        if !self.seen.contains(id) {
            self.seen.put(id.to_string(), ());
        }
    }

    /// Mark the id and report whether it was new.
    pub fn check_and_mark(&mut self, id: &str) -> bool {
        if self.has_seen(id) {
            return false;
        }
        self.seen.put(id.to_string(), ());
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.seen.cap().get()
    }
}

impl std::fmt::Debug for DedupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_check() {
        let mut cache = DedupCache::new(8);
        assert!(!cache.has_seen("m1"));
        cache.mark_seen("m1");
        assert!(cache.has_seen("m1"));
        assert_eq!(cache.len(), 1);

        cache.mark_seen("m1");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_check_and_mark_reports_novelty_once() {
        let mut cache = DedupCache::new(8);
        assert!(cache.check_and_mark("cmd1"));
        assert!(!cache.check_and_mark("cmd1"));
        assert!(!cache.check_and_mark("cmd1"));
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut cache = DedupCache::new(3);
        cache.mark_seen("a");
        cache.mark_seen("b");
        cache.mark_seen("c");

        // Lookups must not refresh "a"
        assert!(cache.has_seen("a"));
        assert!(!cache.check_and_mark("a"));

        cache.mark_seen("d");
        assert!(!cache.has_seen("a"));
        assert!(cache.has_seen("b"));
        assert!(cache.has_seen("c"));
        assert!(cache.has_seen("d"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache = DedupCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.mark_seen("x");
        assert!(cache.has_seen("x"));
    }
}
