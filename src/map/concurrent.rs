//! Concurrent map backends
//!
//! Adapters from the third-party maps under test to [`ContendedMap`].
//!
//! ## Deletion Semantics
//!
//! | Backend | `compute_to_absent` | `remove` |
//! |---------|---------------------|----------|
//! | flurry  | `compute_if_present` with a remapping function returning `None` | `remove` |
//! | dashmap | `entry` under the shard write lock, occupied entries removed | `remove` |
//! | locked  | write lock, entry removed | write lock, entry removed |
//!
//! A compute that finds no mapping has nothing to remap and leaves the map untouched,
//! exactly like a compute whose function returns absent for an absent key.
//!
//! ## Example
//!
//! ```rust
//! use contention_bench::map::{ContendedMap, FlurryMap, Identifier};
//!
//! let map = FlurryMap::new_map();
//! let key = Identifier::new_v4();
//! assert_eq!(ContendedMap::insert(&map, key, key), None);
//! assert_eq!(map.compute_to_absent(&key), None);
//! assert_eq!(ContendedMap::get(&map, &key), None);
//! ```

use super::{ContendedMap, Identifier};
use core::hash::Hash;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fxhash::FxBuildHasher;
use parking_lot::RwLock;
use std::collections::HashMap;

/// `flurry::HashMap` keyed by identifiers
pub type FlurryMap = flurry::HashMap<Identifier, Identifier>;

/// `dashmap::DashMap` keyed by identifiers
pub type ShardedMap = DashMap<Identifier, Identifier>;

impl<K, V> ContendedMap<K, V> for flurry::HashMap<K, V>
where
    K: Hash + Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn new_map() -> Self {
        flurry::HashMap::new()
    }

    #[inline]
    fn insert(&self, key: K, value: V) -> Option<V> {
        self.pin().insert(key, value).cloned()
    }

    #[inline]
    fn compute_to_absent(&self, key: &K) -> Option<V> {
        // Lock-free miss when the key is absent; only a hit locks the bin
        self.pin().compute_if_present(key, |_, _| None).cloned()
    }

    #[inline]
    fn remove(&self, key: &K) -> Option<V> {
        self.pin().remove(key).cloned()
    }

    fn get(&self, key: &K) -> Option<V> {
        self.pin().get(key).cloned()
    }

    fn len(&self) -> usize {
        flurry::HashMap::len(self)
    }
}

impl<K, V> ContendedMap<K, V> for DashMap<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn new_map() -> Self {
        DashMap::new()
    }

    #[inline]
    fn insert(&self, key: K, value: V) -> Option<V> {
        DashMap::insert(self, key, value)
    }

    #[inline]
    fn compute_to_absent(&self, key: &K) -> Option<V> {
        // The shard write lock is held for the whole match
        match self.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                occupied.remove();
                None
            }
            Entry::Vacant(_) => None,
        }
    }

    #[inline]
    fn remove(&self, key: &K) -> Option<V> {
        DashMap::remove(self, key).map(|(_, value)| value)
    }

    fn get(&self, key: &K) -> Option<V> {
        DashMap::get(self, key).map(|entry| entry.value().clone())
    }

    fn len(&self) -> usize {
        DashMap::len(self)
    }
}

/// A `HashMap` behind one `parking_lot::RwLock`
///
/// Every write serializes on the same lock, so both deletion strategies collapse
/// into the same critical section. Useful as a floor for the other backends.
#[derive(Debug)]
pub struct LockedHashMap<K, V> {
    inner: RwLock<HashMap<K, V, FxBuildHasher>>,
}

impl<K, V> LockedHashMap<K, V> {
    /// Create an empty locked map
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::default()),
        }
    }
}

impl<K, V> Default for LockedHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ContendedMap<K, V> for LockedHashMap<K, V>
where
    K: Hash + Eq + Send + Sync,
    V: Clone + Send + Sync,
{
    fn new_map() -> Self {
        Self::new()
    }

    #[inline]
    fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.write().insert(key, value)
    }

    #[inline]
    fn compute_to_absent(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.write();
        if guard.contains_key(key) {
            guard.remove(key);
        }
        None
    }

    #[inline]
    fn remove(&self, key: &K) -> Option<V> {
        self.inner.write().remove(key)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    fn len(&self) -> usize {
        self.inner.read().len()
    }
}
