//! Per-trial shared state
//!
//! One map and one fixed key, shared by every thread of a benchmark group. A fresh
//! state is built for each trial and dropped when the trial ends; the map instance
//! itself is never swapped out while workers run.

use crate::map::{ContendedMap, Identifier};
use crate::{Error, Result};

/// The map under contention plus the single key every thread touches
#[derive(Debug)]
pub struct SharedState<M> {
    key: Identifier,
    map: M,
}

impl<M> SharedState<M>
where
    M: ContendedMap<Identifier, Identifier>,
{
    /// Build the state for one trial: a random key, an empty map, then key -> key
    pub fn setup() -> Self {
        let key = Identifier::new_v4();
        let map = M::new_map();
        map.insert(key, key);
        Self { key, map }
    }

    /// The fixed key, which is also the value it maps to
    #[inline]
    pub fn key(&self) -> Identifier {
        self.key
    }

    /// The shared map
    #[inline]
    pub fn map(&self) -> &M {
        &self.map
    }

    /// Check the map is in a state reachable by interleavings of insert and delete
    ///
    /// The key must either be absent or map to itself, and the map may hold at most
    /// that one entry.
    pub fn verify(&self) -> Result<()> {
        let len = self.map.len();
        match self.map.get(&self.key) {
            Some(value) if value != self.key => Err(Error::CorruptState(format!(
                "key {} maps to foreign value {}",
                self.key, value
            ))),
            Some(_) if len != 1 => Err(Error::CorruptState(format!(
                "key present but map holds {} entries",
                len
            ))),
            None if len != 0 => Err(Error::CorruptState(format!(
                "key absent but map holds {} entries",
                len
            ))),
            _ => Ok(()),
        }
    }
}
