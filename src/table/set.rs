/*!
 * Robin Hood Set
 * Thin wrapper presenting the map as an identity set
 */

use super::map::RhMap;
use ahash::RandomState;
use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

/// Set of keys backed by [`RhMap`], iterated in insertion order.
pub struct RhSet<K, S = RandomState> {
    map: RhMap<K, (), S>,
}

impl<K: Hash + Eq> RhSet<K> {
    pub fn new() -> Self {
        Self { map: RhMap::new() }
    }

    pub fn with_capacity(table_sz: usize) -> Self {
        Self {
            map: RhMap::with_capacity(table_sz),
        }
    }
}

impl<K: Hash + Eq, S: BuildHasher> RhSet<K, S> {
    pub fn with_hasher(table_sz: usize, hasher: S) -> Self {
        Self {
            map: RhMap::with_hasher(table_sz, hasher),
        }
    }

    /// Insert a key. Returns `false` if it was already present.
    pub fn insert(&mut self, key: K) -> bool {
        self.map.insert(key, ())
    }

    /// Remove a key. Returns `true` if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.remove(key).is_some()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Fetch the stored key equal to `key`, if any. This is what makes the
    /// set usable for canonicalization: the returned reference is the one
    /// copy the set owns.
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get_key_value(key).map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn table_size(&self) -> usize {
        self.map.table_size()
    }

    /// Iterate keys in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.map.keys()
    }
}

impl<K: Hash + Eq> Default for RhSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + fmt::Debug, S: BuildHasher> fmt::Debug for RhSet<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
