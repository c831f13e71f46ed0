//! Viewed-state tracking persisted through a `KeyValueStore`.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the JSON-encoded id list.
pub const VIEWED_KEY: &str = "viewedItems";

/// Insertion-ordered set of ids. Ids need not exist in the current store.
///
/// `ids` keeps the order used for serialisation; `index` answers membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewedSet {
    ids: Vec<String>,
    index: HashSet<String>,
}

impl ViewedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Flip membership; returns the new membership.
    pub fn flip(&mut self, id: &str) -> bool {
        if self.index.remove(id) {
            self.ids.retain(|v| v != id);
            false
        } else {
            self.index.insert(id.to_string());
            self.ids.push(id.to_string());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// JSON array of ids, e.g. `["5","9"]`.
    pub fn to_json(&self) -> String {
        // Serialising a Vec<String> cannot fail.
        serde_json::to_string(&self.ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// Parse a JSON array of ids, dropping repeats.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let raw: Vec<String> = serde_json::from_str(text)?;
        let mut set = Self::new();
        for id in raw {
            if set.index.insert(id.clone()) {
                set.ids.push(id);
            }
        }
        Ok(set)
    }
}

/// The viewed set plus the store it is flushed to on every change.
pub struct ViewedTracker {
    set: ViewedSet,
    store: Box<dyn KeyValueStore>,
}

impl ViewedTracker {
    /// Restore the set from `store`. Missing or unreadable values start empty.
    pub fn restore(store: Box<dyn KeyValueStore>) -> Self {
        let set = match store.get(VIEWED_KEY) {
            None => ViewedSet::new(),
            Some(text) => ViewedSet::from_json(&text).unwrap_or_else(|e| {
                warn!("viewed: stored value is not an id list ({}), starting empty", e);
                ViewedSet::new()
            }),
        };
        debug!("viewed: restored {} id(s)", set.len());
        Self { set, store }
    }

    pub fn is_viewed(&self, id: &str) -> bool {
        self.set.contains(id)
    }

    pub fn set(&self) -> &ViewedSet {
        &self.set
    }

    /// Flip `id` and write the whole set back before returning.
    /// On a failed write the flip is undone.
    pub fn toggle(&mut self, id: &str) -> Result<bool, StorageError> {
        let now_viewed = self.set.flip(id);
        if let Err(e) = self.store.set(VIEWED_KEY, &self.set.to_json()) {
            self.set.flip(id);
            warn!("viewed: could not persist toggle of {}: {}", id, e);
            return Err(e);
        }
        debug!("viewed: {} -> {}", id, now_viewed);
        Ok(now_viewed)
    }

    /// Raw stored value, mostly for diagnostics and tests.
    pub fn stored_value(&self) -> Option<String> {
        self.store.get(VIEWED_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    #[test]
    fn test_toggle_example() {
        let mut t = ViewedTracker::restore(Box::new(MemoryStore::new()));
        assert!(t.toggle("5").unwrap());
        assert!(t.is_viewed("5"));
        assert_eq!(t.stored_value().as_deref(), Some("[\"5\"]"));

        assert!(!t.toggle("5").unwrap());
        assert!(!t.is_viewed("5"));
        assert!(t.set().is_empty());
        assert_eq!(t.stored_value().as_deref(), Some("[]"));
    }

    #[test]
    fn test_toggle_twice_restores_serialisation() {
        let mut store = MemoryStore::new();
        store.set(VIEWED_KEY, "[\"a\",\"b\"]").unwrap();
        let mut t = ViewedTracker::restore(Box::new(store));
        let before = t.stored_value();

        t.toggle("c").unwrap();
        t.toggle("c").unwrap();
        assert_eq!(t.stored_value(), before);

        t.toggle("a").unwrap();
        t.toggle("a").unwrap();
        let after = ViewedSet::from_json(&t.stored_value().unwrap()).unwrap();
        let mut ids: Vec<&str> = after.iter().collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_json_roundtrip_including_empty() {
        for ids in [vec![], vec!["1"], vec!["x", "y", "with \"quote\"", ""]] {
            let mut set = ViewedSet::new();
            for id in &ids {
                set.flip(id);
            }
            assert_eq!(ViewedSet::from_json(&set.to_json()).unwrap(), set);
        }
        assert_eq!(ViewedSet::new().to_json(), "[]");
    }

    #[test]
    fn test_from_json_drops_duplicates() {
        let set = ViewedSet::from_json("[\"a\",\"a\",\"b\"]").unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_large_set_membership_and_order() {
        let mut set = ViewedSet::new();
        for i in 0..10_000 {
            set.flip(&i.to_string());
        }
        assert!((0..10_000).all(|i| set.contains(&i.to_string())));
        assert!(!set.contains("10000"));

        assert!(!set.flip("1"));
        assert!(!set.contains("1"));
        assert_eq!(set.len(), 9_999);
        let head: Vec<&str> = set.iter().take(3).collect();
        assert_eq!(head, vec!["0", "2", "3"]);
    }

    #[test]
    fn test_corrupt_value_starts_empty() {
        let mut store = MemoryStore::new();
        store.set(VIEWED_KEY, "{oops").unwrap();
        let t = ViewedTracker::restore(Box::new(store));
        assert!(t.set().is_empty());
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let mut t = ViewedTracker::restore(Box::new(FailingStore));
        assert!(t.toggle("1").is_err());
        assert!(!t.is_viewed("1"));
    }
}
