//! Map backends under test
//!
//! This module defines the operations the benchmark performs on a shared map and
//! implements them for the concurrent maps it can measure.
//!
//! ## Available Maps
//!
//! - [`MapKind::Flurry`]: `flurry::HashMap`, a port of Java's `ConcurrentHashMap`
//!   (per-bin locking on writes, lock-free reads)
//! - [`MapKind::Dashmap`]: `dashmap::DashMap`, sharded `RwLock`s
//! - [`MapKind::Locked`]: a single `parking_lot::RwLock` around a `HashMap`, the
//!   coarse-grained baseline
//!
//! ## Compute on an absent key
//!
//! Java's `ConcurrentHashMap.compute` locks the key's bin even when the key is
//! missing. `dashmap` behaves the same way: `entry` takes the shard write lock
//! for a vacant key too, so it is the backend whose compute group exercises that
//! path. `flurry` only offers `compute_if_present`, which returns early without
//! locking when the key is absent, so under `flurry` a compute that finds nothing
//! costs about as much as a read.
//!
//! ## Contract
//!
//! Every single-key operation must be linearizable without any lock held by the
//! caller. Deleting through [`ContendedMap::compute_to_absent`] must remove the
//! mapping outright; a map that stores an "absent" marker as a value is broken.

use serde::{Deserialize, Serialize};

pub mod concurrent;

pub use self::concurrent::{FlurryMap, LockedHashMap, ShardedMap};

/// Key and value type of the shared map: a random 128-bit identifier mapped to itself
pub type Identifier = uuid::Uuid;

/// Single-key operations exercised by the benchmark
///
/// # Type Parameters
///
/// * `K` - The key type
/// * `V` - The value type, returned by value so results can be fed to a sink
pub trait ContendedMap<K, V>: Send + Sync {
    /// Create an empty map
    fn new_map() -> Self
    where
        Self: Sized;

    /// Unconditionally associate `value` with `key`, returning the previous value
    fn insert(&self, key: K, value: V) -> Option<V>;

    /// Atomically recompute the mapping for `key` with a function that ignores the
    /// current value and yields "absent", which removes the mapping
    ///
    /// Returns the resulting value, which is always `None`.
    fn compute_to_absent(&self, key: &K) -> Option<V>;

    /// Atomically remove the mapping for `key`, returning the removed value
    fn remove(&self, key: &K) -> Option<V>;

    /// Look up the current value for `key`
    fn get(&self, key: &K) -> Option<V>;

    /// Number of entries currently in the map
    fn len(&self) -> usize;

    /// Check if the map holds no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which concurrent map implementation to measure
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    /// `flurry::HashMap`
    #[default]
    Flurry,
    /// `dashmap::DashMap`
    Dashmap,
    /// `parking_lot::RwLock<HashMap>`
    Locked,
}

impl MapKind {
    /// Every backend, in reporting order
    pub const ALL: [MapKind; 3] = [MapKind::Flurry, MapKind::Dashmap, MapKind::Locked];

    /// Short name used on the command line and in reports
    pub fn as_str(self) -> &'static str {
        match self {
            MapKind::Flurry => "flurry",
            MapKind::Dashmap => "dashmap",
            MapKind::Locked => "locked",
        }
    }
}

impl core::fmt::Display for MapKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}


#[cfg(test)]
mod proptests;
