//! Three-way diff between a snapshot and a freshly fetched collection.

use super::snapshot::{RepositoryChanges, Snapshot};
use indexmap::IndexMap;
use std::hash::Hash;
use tracing::{debug, warn};

/// Result of [`diff`]: the changes plus the snapshot that replaces `previous`.
#[derive(Debug)]
pub struct Diff<T, K = String> {
    pub changes: RepositoryChanges<T>,
    pub snapshot: Snapshot<T, K>,
}

/// Compare `current` against `previous`, correlating entities by identity only.
///
/// If `current` holds the same identity twice, the last occurrence wins and
/// the key is reported once, at the position of its first occurrence.
pub fn diff<T, K, F>(previous: &Snapshot<T, K>, current: Vec<T>, identity_of: F) -> Diff<T, K>
where
    T: Clone + PartialEq,
    K: Hash + Eq + Clone + std::fmt::Debug,
    F: Fn(&T) -> K,
{
    let mut current_by_key: IndexMap<K, T> = IndexMap::with_capacity(current.len());
    for entity in current {
        let key = identity_of(&entity);
        if let Some(replaced) = current_by_key.insert(key, entity) {
            warn!(key = ?identity_of(&replaced), "duplicate identity in fetched collection");
        }
    }

    let mut added = Vec::new();
    let mut modified = Vec::new();
    for (key, entity) in &current_by_key {
        match previous.get(key) {
            None => added.push(entity.clone()),
            Some(before) if before != entity => modified.push(entity.clone()),
            Some(_) => {}
        }
    }

    let deleted: Vec<T> = previous
        .iter()
        .filter(|(key, _)| !current_by_key.contains_key(*key))
        .map(|(_, entity)| entity.clone())
        .collect();

    debug!(
        added = added.len(),
        modified = modified.len(),
        deleted = deleted.len(),
        "computed collection diff"
    );

    Diff {
        changes: RepositoryChanges::new(added, modified, deleted),
        snapshot: Snapshot::from_entries(current_by_key),
    }
}
