//! TC loop suppression
//!
//! Remembers the highest TC sequence number seen per originator. Sequence
//! numbers compare as integers. The cache is cleared on an epoch schedule,
//! not by size, so a restarted originator is heard again after the next
//! reset.

use std::collections::HashMap;

use olsr_core::NodeId;

/// Highest TC sequence number seen per originator
#[derive(Debug, Clone, Default)]
pub struct TcDedupCache {
    seen: HashMap<NodeId, u64>,
}

impl TcDedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a TC from `source`; returns false if it is a duplicate
    ///
    /// A TC is a duplicate when the cached sequence number is equal to or
    /// greater than `seqno`. Duplicates leave the cache untouched.
    pub fn admit(&mut self, source: &NodeId, seqno: u64) -> bool {
        match self.seen.get_mut(source) {
            Some(last) if *last >= seqno => false,
            Some(last) => {
                *last = seqno;
                true
            }
            None => {
                self.seen.insert(source.clone(), seqno);
                true
            }
        }
    }

    /// Last sequence number admitted for `source`
    pub fn last_seen(&self, source: &NodeId) -> Option<u64> {
        self.seen.get(source).copied()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    #[test]
    fn test_first_sighting_is_admitted() {
        let mut cache = TcDedupCache::new();
        assert!(cache.admit(&id("C"), 3));
        assert_eq!(cache.last_seen(&id("C")), Some(3));
    }

    #[test]
    fn test_equal_or_older_is_duplicate() {
        let mut cache = TcDedupCache::new();
        cache.admit(&id("C"), 3);
        assert!(!cache.admit(&id("C"), 3));
        assert!(!cache.admit(&id("C"), 2));
        // An older copy never rewinds the cache
        assert_eq!(cache.last_seen(&id("C")), Some(3));
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        let mut cache = TcDedupCache::new();
        cache.admit(&id("C"), 9);
        assert!(cache.admit(&id("C"), 10));
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut cache = TcDedupCache::new();
        cache.admit(&id("C"), 3);
        cache.admit(&id("D"), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.admit(&id("C"), 3));
    }
}
