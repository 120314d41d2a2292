use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::key::{DataKey, DerivedData, Item};

/// The authoritative cache of completed derived data for one volume.
///
/// Holds at most one item per key. Disposal of a replaced or removed item
/// means dropping the store's reference to it. Snapshots handed out earlier
/// stay valid.
#[derive(Default)]
pub struct DerivedDataStore {
    items: Mutex<FxHashMap<DataKey, Item>>,
}

impl DerivedDataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an item for the key is cached.
    pub fn has(&self, key: DataKey) -> bool {
        self.items.lock().contains_key(&key)
    }

    /// The cached item for the key, if any.
    pub fn get(&self, key: DataKey) -> Option<Item> {
        self.items.lock().get(&key).cloned()
    }

    /// The cached item for `T`, if any.
    pub fn get_typed<T: DerivedData>(&self) -> Option<std::sync::Arc<T>> {
        self.get(T::KEY).and_then(|item| item.downcast::<T>())
    }

    /// Insert an item under its key, replacing and disposing the previous
    /// item for that key.
    pub fn insert(&self, item: Item) {
        let key = item.key();
        let previous = self.items.lock().insert(key, item);
        if previous.is_some() {
            tracing::trace!(%key, "replaced derived data");
        } else {
            tracing::trace!(%key, "inserted derived data");
        }
        // The old item is released after the lock.
        drop(previous);
    }

    /// Dispose of the item for the key. Returns whether there was one.
    pub fn remove(&self, key: DataKey) -> bool {
        let removed = self.items.lock().remove(&key);
        if removed.is_some() {
            tracing::trace!(%key, "removed derived data");
        }
        removed.is_some()
    }

    /// Dispose of all items.
    pub fn clear(&self) {
        let items = std::mem::take(&mut *self.items.lock());
        tracing::trace!(count = items.len(), "cleared derived data");
        drop(items);
    }

    /// How many items are cached.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether no items are cached.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// The keys of all cached items, sorted by name.
    pub fn keys(&self) -> Vec<DataKey> {
        let mut keys: Vec<_> = self.items.lock().keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}
