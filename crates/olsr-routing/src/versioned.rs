//! Content-versioned sets
//!
//! The MPR and MS sets each carry a version that moves only when the set's
//! contents change; recomputing an identical set leaves it untouched. The MS
//! version doubles as the sequence number of the TC messages we originate.

use std::collections::BTreeSet;

/// A set whose version counts content changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedSet<T: Ord> {
    items: BTreeSet<T>,
    version: u64,
}

impl<T: Ord> Default for VersionedSet<T> {
    fn default() -> Self {
        Self {
            items: BTreeSet::new(),
            version: 0,
        }
    }
}

impl<T: Ord + Clone> VersionedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents; bumps the version only if they differ
    pub fn replace(&mut self, items: BTreeSet<T>) -> bool {
        if items == self.items {
            return false;
        }
        self.items = items;
        self.version += 1;
        true
    }

    /// Add one item; bumps the version if it was absent
    pub fn insert(&mut self, item: T) -> bool {
        let added = self.items.insert(item);
        if added {
            self.version += 1;
        }
        added
    }

    /// Remove one item; bumps the version if it was present
    pub fn remove(&mut self, item: &T) -> bool {
        let removed = self.items.remove(item);
        if removed {
            self.version += 1;
        }
        removed
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> BTreeSet<T> {
        self.items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_with_same_contents_keeps_version() {
        let mut set: VersionedSet<u8> = VersionedSet::new();
        assert!(set.replace([1, 2].into()));
        assert_eq!(set.version(), 1);

        assert!(!set.replace([2, 1].into()));
        assert_eq!(set.version(), 1);

        assert!(set.replace([3].into()));
        assert_eq!(set.version(), 2);
    }

    #[test]
    fn test_insert_and_remove_bump_on_change_only() {
        let mut set: VersionedSet<&str> = VersionedSet::new();
        assert!(set.insert("B"));
        assert!(!set.insert("B"));
        assert_eq!(set.version(), 1);

        assert!(!set.remove(&"C"));
        assert_eq!(set.version(), 1);
        assert!(set.remove(&"B"));
        assert_eq!(set.version(), 2);
        assert!(set.is_empty());
    }
}
