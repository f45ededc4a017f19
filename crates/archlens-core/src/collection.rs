//! Ordered-unique container keyed by entity id.
//!
//! Every node and edge collection in the pipeline is an [`IdMap`]. It acts as
//! a map (lookup by id), as a set (membership, filter, union), and preserves
//! first-insertion order so that processing identical inputs always yields
//! identical output order.
//!
//! Two insertion flavours exist:
//!
//! - [`IdMap::insert`] keeps the first occurrence (attribute collection from
//!   raw records, where the first observation wins).
//! - [`IdMap::upsert`] replaces the stored value but keeps its original
//!   position (graph merging, where later graphs override attributes).

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;
use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// An entity that carries a stable string id.
pub trait Keyed {
    /// The id used for membership and deduplication.
    fn key(&self) -> &str;
}

/// Insertion-ordered collection with unique ids.
///
/// Mutable access ([`IdMap::get_mut`], [`IdMap::iter_mut`]) must not change
/// an entry's key; use [`IdMap::remove`] + [`IdMap::insert`] to re-key.
#[derive(Clone)]
pub struct IdMap<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for IdMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for IdMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for IdMap<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<T: Keyed> IdMap<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert `value` unless its id is already present.
    ///
    /// Returns `true` when the value was inserted.
    pub fn insert(&mut self, value: T) -> bool {
        if self.index.contains_key(value.key()) {
            return false;
        }
        self.index.insert(value.key().to_string(), self.entries.len());
        self.entries.push(value);
        true
    }

    /// Insert or replace `value`, keeping the original position on replace.
    ///
    /// Returns the previous value for the same id, if any.
    pub fn upsert(&mut self, value: T) -> Option<T> {
        if let Some(&pos) = self.index.get(value.key()) {
            return Some(std::mem::replace(&mut self.entries[pos], value));
        }
        self.insert(value);
        None
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.index.get(key).map(|&pos| &mut self.entries[pos])
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Remove the entry for `key`, preserving the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let pos = self.index.remove(key)?;
        let removed = self.entries.remove(pos);
        self.reindex();
        Some(removed)
    }

    /// Keep only the entries for which `keep` returns `true`.
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.entries.retain(keep);
        self.reindex();
    }

    /// Return a new container holding the entries that satisfy `keep`.
    #[must_use]
    pub fn filter(&self, mut keep: impl FnMut(&T) -> bool) -> Self
    where
        T: Clone,
    {
        self.entries.iter().filter(|v| keep(v)).cloned().collect()
    }

    /// Union `other` into `self`; entries from `other` override on id
    /// collision but keep the position first seen in `self`.
    pub fn union(&mut self, other: Self) {
        for value in other {
            self.upsert(value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Keyed::key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.entries.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (pos, value) in self.entries.iter().enumerate() {
            self.index.insert(value.key().to_string(), pos);
        }
    }
}

impl<T: Keyed> FromIterator<T> for IdMap<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<T: Keyed> Extend<T> for IdMap<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T> IntoIterator for IdMap<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a IdMap<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T: Serialize> Serialize for IdMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for value in &self.entries {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl<'de, T: Keyed + Deserialize<'de>> Deserialize<'de> for IdMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<T>::deserialize(deserializer)?;
        Ok(values.into_iter().collect())
    }
}
