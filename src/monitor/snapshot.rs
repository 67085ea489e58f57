//! Snapshot of last-known base states and its atomically swapped holder.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use super::TrackedEntity;

/// Full set of last-known entity states as of the last successful poll.
///
/// Entities are never removed once observed; a base that disappears upstream
/// keeps its last state here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entities: HashMap<String, TrackedEntity>,
    unindexed: Option<Value>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an entity by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TrackedEntity> {
        self.entities.get(key)
    }

    /// Returns `true` if the key has been observed.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entities.contains_key(key)
    }

    /// Number of tracked entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if nothing has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Raw payload of the last cycle whose shape was not recognized.
    #[must_use]
    pub const fn unindexed(&self) -> Option<&Value> {
        self.unindexed.as_ref()
    }

    pub(crate) fn insert(&mut self, entity: TrackedEntity) {
        self.entities.insert(entity.key.clone(), entity);
    }

    pub(crate) fn retain_keys(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entities.retain(|key, _| keep(key));
    }

    pub(crate) fn set_unindexed(&mut self, payload: Option<Value>) {
        self.unindexed = payload;
    }
}

impl FromIterator<TrackedEntity> for Snapshot {
    fn from_iter<T: IntoIterator<Item = TrackedEntity>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for entity in iter {
            snapshot.insert(entity);
        }
        snapshot
    }
}

/// Holder of the single live [`Snapshot`].
///
/// Readers get an `Arc` to an immutable snapshot; a new snapshot replaces the
/// old one in a single swap, so a reader never sees a half-applied cycle.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Creates a store holding an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the current snapshot.
    pub fn replace(&self, next: Snapshot) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }
}
