//! Concurrent key index
//!
//! Readers take a shared lock and never wait on the writer thread's queue.
//! Only the writer takes the exclusive lock.

use std::collections::HashMap;

use ahash::RandomState;
use parking_lot::RwLock;

use crate::recency::Handle;

struct Slot<V> {
    handle: Handle,
    value: V,
}

/// Key -> (recency handle, published value)
pub(crate) struct Index<V> {
    map: RwLock<HashMap<String, Slot<V>, RandomState>>,
}

impl<V: Clone> Index<V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            map: RwLock::new(HashMap::with_capacity_and_hasher(
                capacity,
                RandomState::new(),
            )),
        }
    }

    pub(crate) fn lookup(&self, key: &str) -> Option<V> {
        self.map.read().get(key).map(|slot| slot.value.clone())
    }

    pub(crate) fn handle(&self, key: &str) -> Option<Handle> {
        self.map.read().get(key).map(|slot| slot.handle)
    }

    pub(crate) fn store(&self, key: String, handle: Handle, value: V) {
        self.map.write().insert(key, Slot { handle, value });
    }

    /// Overwrite the value of an existing key in place
    pub(crate) fn replace(&self, key: &str, value: V) -> bool {
        match self.map.write().get_mut(key) {
            Some(slot) => {
                slot.value = value;
                true
            }
            None => false,
        }
    }

    /// Drop `evicted` and store `key` under a single write guard
    pub(crate) fn swap(&self, evicted: &str, key: String, handle: Handle, value: V) {
        let mut map = self.map.write();
        map.remove(evicted);
        map.insert(key, Slot { handle, value });
    }
}

impl<V> Index<V> {
    pub(crate) fn clear(&self) {
        self.map.write().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.map.read().len()
    }
}
