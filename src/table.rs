//! Keyed record table used as an immutable state snapshot.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// An application value that carries its own identifier.
pub trait Record {
    type Key: Ord + Clone;

    /// The identifier field this record is indexed by.
    fn key(&self) -> Self::Key;
}

/// A mapping from identifier to record.
///
/// Tables are values: every update consumes the table and returns the new
/// one, so a snapshot handed to observers is never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table<K: Ord, V> {
    rows: BTreeMap<K, V>,
}

impl<K: Ord, V> Table<K, V> {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    /// Index a sequence of records by their identifier.
    ///
    /// Later records replace earlier ones with the same key.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Record<Key = K>,
    {
        records.into_iter().map(|r| (r.key(), r)).collect()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.rows.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.rows.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.rows.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.rows.values()
    }

    /// Return the table with `key` set to `value`.
    pub fn set(mut self, key: K, value: V) -> Self {
        self.rows.insert(key, value);
        self
    }

    /// Return the table with `record` stored under its own key.
    pub fn put(self, record: V) -> Self
    where
        V: Record<Key = K>,
    {
        let key = record.key();
        self.set(key, record)
    }

    /// Return the table without `key`.
    pub fn remove(mut self, key: &K) -> Self {
        self.rows.remove(key);
        self
    }

    /// Return the table with `f` applied to the row at `key`, if present.
    pub fn update<F>(mut self, key: &K, f: F) -> Self
    where
        F: FnOnce(V) -> V,
    {
        if let Some((key, value)) = self.rows.remove_entry(key) {
            self.rows.insert(key, f(value));
        }
        self
    }
}

impl<K: Ord, V> Default for Table<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for Table<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<K: Ord, V> From<BTreeMap<K, V>> for Table<K, V> {
    fn from(rows: BTreeMap<K, V>) -> Self {
        Self { rows }
    }
}

impl<K: Ord, V> From<HashMap<K, V>> for Table<K, V> {
    fn from(rows: HashMap<K, V>) -> Self {
        rows.into_iter().collect()
    }
}

impl<K: Ord, V> IntoIterator for Table<K, V> {
    type Item = (K, V);
    type IntoIter = std::collections::btree_map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
