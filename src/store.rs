//! The in-memory map that delivered writes are applied to.

use crate::ClientKey;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// A concurrent key-value store for delivered writes.
///
/// The handle is cheap to clone; all clones share the same map. Writes are
/// applied by the schedulers' delivery tasks, reads are served by the worker's
/// read handler, so the map is shared across threads.
#[derive(Debug, Default, Clone)]
pub struct KeyValueStore {
    inner: Arc<Mutex<HashMap<ClientKey, String>>>,
}

impl KeyValueStore {
    /// Gets the current value for the given key, if present.
    pub fn get(&self, key: &ClientKey) -> Option<String> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    /// Applies a delivered write, overwriting any previous value of the key.
    pub fn apply(&self, key: ClientKey, value: String) {
        self.inner.lock().unwrap().insert(key, value);
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Returns whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Returns a copy of the full map.
    pub fn snapshot(&self) -> HashMap<ClientKey, String> {
        self.inner.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_overwrites() {
        let store = KeyValueStore::default();
        store.apply("x".into(), "1".to_owned());
        store.apply("x".into(), "2".to_owned());
        assert_eq!(store.get(&"x".into()), Some("2".to_owned()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clones_share_the_map() {
        let store = KeyValueStore::default();
        let clone = store.clone();
        store.apply("y".into(), "1".to_owned());
        assert_eq!(clone.get(&"y".into()), Some("1".to_owned()));
    }
}
