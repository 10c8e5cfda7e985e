//! Dedup store: the last observed screener snapshot.

use crate::session::{SenderKey, UnscreenedSet};

/// Remembers who was already waiting so only newcomers trigger a notification.
#[derive(Debug, Default, Clone)]
pub struct DedupStore {
    seen: UnscreenedSet,
}

impl DedupStore {
    pub fn new(initial: UnscreenedSet) -> Self {
        Self { seen: initial }
    }

    /// Swap in a fresh snapshot and return the senders it adds.
    ///
    /// The stored set is replaced wholesale even when nothing is new, so
    /// senders who left the screener count as new if they come back.
    pub fn replace(&mut self, fresh: UnscreenedSet) -> UnscreenedSet {
        let added = fresh.difference(&self.seen).cloned().collect();
        self.seen = fresh;
        added
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn contains(&self, key: &SenderKey) -> bool {
        self.seen.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keys: &[&str]) -> UnscreenedSet {
        keys.iter().map(|k| SenderKey::new(*k)).collect()
    }

    #[test]
    fn reports_only_additions() {
        let mut store = DedupStore::new(set(&["A"]));
        let added = store.replace(set(&["A", "B", "C"]));
        assert_eq!(added, set(&["B", "C"]));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn unchanged_snapshot_adds_nothing() {
        let mut store = DedupStore::new(set(&["A", "B"]));
        assert!(store.replace(set(&["A", "B"])).is_empty());
        assert!(store.replace(set(&["A", "B"])).is_empty());
    }

    #[test]
    fn removals_are_forgotten() {
        let mut store = DedupStore::new(set(&["A", "B"]));
        assert!(store.replace(set(&["A"])).is_empty());
        assert!(!store.contains(&SenderKey::new("B")));
        assert_eq!(store.replace(set(&["A", "B"])), set(&["B"]));
    }

    #[test]
    fn emptied_screener() {
        let mut store = DedupStore::new(set(&["A"]));
        assert!(store.replace(UnscreenedSet::new()).is_empty());
        assert!(store.is_empty());
    }
}
