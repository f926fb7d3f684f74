use std::collections::HashMap;

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};

use crate::entities::{Versioned, VersionedEntity};
use crate::storage::{get_json, put_json, KeyValueStore, StorageError};

/// Concurrent key-value cache of backend entities.
///
/// `put` overwrites unconditionally: the backend owns versions, and version
/// arbitration against the fallback happens at query time in the resolver.
pub struct VersionedCache<T> {
    entries: DashMap<String, VersionedEntity<T>>,
}

impl<T: Clone> VersionedCache<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<VersionedEntity<T>> {
        self.entries.get(id).map(|r| r.value().clone())
    }

    /// Store `entity` under `id`, replacing whatever was there (last write wins).
    pub fn put(&self, id: impl Into<String>, entity: VersionedEntity<T>) {
        self.entries.insert(id.into(), entity);
    }

    pub fn remove(&self, id: &str) -> Option<VersionedEntity<T>> {
        self.entries.remove(id).map(|(_, entity)| entity)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Point-in-time copy of every entry.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, VersionedEntity<T>> {
        self.entries
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    /// Replace the whole cache content with `entries`.
    ///
    /// Overwrites first and prunes after, so a key present both before and
    /// after is never observed missing by a concurrent `get`.
    pub fn replace_all(&self, entries: HashMap<String, VersionedEntity<T>>) {
        for (id, entity) in &entries {
            self.entries.insert(id.clone(), entity.clone());
        }
        self.entries.retain(|id, _| entries.contains_key(id));
    }
}

impl<T: Versioned + Clone> VersionedCache<T> {
    /// Store a backend entity under its own key and version.
    pub fn put_entity(&self, value: T) {
        let id = value.key().to_string();
        self.put(id, VersionedEntity::from_entity(value));
    }
}

impl<T: Clone + Serialize + DeserializeOwned> VersionedCache<T> {
    /// Write the current content to `store` under `key`.
    pub fn save_to(&self, store: &dyn KeyValueStore, key: &str) -> Result<(), StorageError> {
        put_json(store, key, &self.snapshot())
    }

    /// Decode content previously written with [`Self::save_to`] without
    /// applying it. `None` when nothing was saved under `key`.
    pub fn read_from(
        store: &dyn KeyValueStore,
        key: &str,
    ) -> Result<Option<HashMap<String, VersionedEntity<T>>>, StorageError> {
        get_json(store, key)
    }
}

impl<T: Clone> Default for VersionedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
