//! HydrationMap: the insertion-ordered, mergeable entity map behind every hydration result.
//!
//! A key can be in one of three states:
//!
//! - **absent**: never looked up ([HydrationMap::get] returns `None`)
//! - **tombstone**: looked up and confirmed missing (`Some(None)`)
//! - **present**: `Some(Some(value))`
//!
//! Callers rely on the tombstone/absent distinction to avoid re-fetching entities the data
//! plane already reported as not found.

use serde::{ser::SerializeMap, Serialize, Serializer};
use std::{borrow::Borrow, collections::BTreeMap};

#[derive(Debug, Clone, PartialEq)]
pub struct HydrationMap<K, V> {
    entries: Vec<(K, Option<V>)>,
    index: BTreeMap<K, usize>,
}

impl<K: Ord + Clone, V> Default for HydrationMap<K, V> {
    fn default() -> Self {
        HydrationMap {
            entries: Vec::new(),
            index: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, V> HydrationMap<K, V> {
    pub fn new() -> Self {
        HydrationMap::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `None` when the key was never set, `Some(None)` for a tombstone.
    pub fn get<Q>(&self, key: &Q) -> Option<Option<&V>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.index
            .get(key)
            .map(|idx| self.entries[*idx].1.as_ref())
    }

    /// The stored value, collapsing tombstones and absent keys together.
    pub fn get_value<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).flatten()
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.entries[idx].1.as_mut()
    }

    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.index.contains_key(key)
    }

    pub fn is_tombstone<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        matches!(self.get(key), Some(None))
    }

    /// Set a value (or a tombstone with `None`). An existing key is overwritten in place and keeps
    /// its position; a new key is appended.
    pub fn set(&mut self, key: K, value: Option<V>) -> &mut Self {
        match self.index.get(&key) {
            Some(idx) => self.entries[*idx].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
        self
    }

    /// Mutable access to the value under `key`, inserting `init()` if the key is absent or
    /// tombstoned. A tombstone is replaced in place.
    pub fn get_or_insert_with<F>(&mut self, key: K, init: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let idx = match self.index.get(&key) {
            Some(idx) => *idx,
            None => {
                let idx = self.entries.len();
                self.index.insert(key.clone(), idx);
                self.entries.push((key, None));
                idx
            }
        };
        self.entries[idx].1.get_or_insert_with(init)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Values in insertion order; tombstones are yielded as `None`.
    pub fn values(&self) -> impl Iterator<Item = Option<&V>> + '_ {
        self.entries.iter().map(|(_, v)| v.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, Option<&V>)> + '_ {
        self.entries.iter().map(|(k, v)| (k, v.as_ref()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, Option<&mut V>)> + '_ {
        self.entries.iter_mut().map(|(k, v)| (&*k, v.as_mut()))
    }

    /// Fold `other` into `self`. Keys new to `self` are appended in `other`'s order after all
    /// existing keys; keys already present are overwritten in place. Values are replaced
    /// wholesale, never merged; callers that need value-level merging do it before calling.
    pub fn merge(&mut self, other: HydrationMap<K, V>) -> &mut Self {
        for (key, value) in other.entries {
            self.set(key, value);
        }
        self
    }
}

impl<K: Ord + Clone, V> FromIterator<(K, Option<V>)> for HydrationMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut map = HydrationMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord + Clone, V> Extend<(K, Option<V>)> for HydrationMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, Option<V>)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K, V> IntoIterator for HydrationMap<K, V> {
    type Item = (K, Option<V>);
    type IntoIter = std::vec::IntoIter<(K, Option<V>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Serialize, V: Serialize> Serialize for HydrationMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in self.entries.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
