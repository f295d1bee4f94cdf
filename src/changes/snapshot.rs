//! Identity-keyed views of an entity collection.

use indexmap::IndexMap;
use serde::Serialize;
use std::hash::Hash;

/// Last observed state of a collection, keyed by identity.
///
/// Keys keep the order in which they were first observed. A snapshot is
/// replaced wholesale after each diff and never edited in place.
#[derive(Clone, Debug)]
pub struct Snapshot<T, K = String> {
    entries: IndexMap<K, T>,
}

impl<T, K: Hash + Eq> Snapshot<T, K> {
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub(crate) fn from_entries(entries: IndexMap<K, T>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &K) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Entities in stored order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &T)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: PartialEq, K: Hash + Eq> PartialEq for Snapshot<T, K> {
    /// Equal entries in the same order.
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().zip(other.entries.iter()).all(|(a, b)| a == b)
    }
}

impl<T, K: Hash + Eq> Default for Snapshot<T, K> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Outcome of one change computation.
///
/// Each sequence keeps discovery order: `added` and `modified` follow the
/// current collection, `deleted` follows the previous snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RepositoryChanges<T> {
    added: Vec<T>,
    modified: Vec<T>,
    deleted: Vec<T>,
}

impl<T> RepositoryChanges<T> {
    pub fn new(added: Vec<T>, modified: Vec<T>, deleted: Vec<T>) -> Self {
        Self {
            added,
            modified,
            deleted,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn added(&self) -> &[T] {
        &self.added
    }

    pub fn modified(&self) -> &[T] {
        &self.modified
    }

    pub fn deleted(&self) -> &[T] {
        &self.deleted
    }

    /// Total number of changed entities.
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_parts(self) -> (Vec<T>, Vec<T>, Vec<T>) {
        (self.added, self.modified, self.deleted)
    }
}

impl<T> Default for RepositoryChanges<T> {
    fn default() -> Self {
        Self::empty()
    }
}
