//! Change detection between the previous snapshot and a fresh payload.

use std::fmt;
use std::time::SystemTime;

use serde_json::Value;

use super::shape::{PayloadShape, index_entries};
use super::{AllowList, Snapshot, TrackedEntity};
use crate::config::defaults;

/// Kind of a [`ChangeEvent`], used for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A base lost more health than the threshold.
    HealthDropped,
    /// A base listed new items.
    NewItemsListed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HealthDropped => f.write_str("health_dropped"),
            Self::NewItemsListed => f.write_str("new_items_listed"),
        }
    }
}

/// A meaningful change detected for one base in one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Health fell by more than the configured threshold.
    HealthDropped {
        /// Station key
        key: String,
        /// Current owner
        owner: String,
        /// Health at the previous poll
        old_health: f64,
        /// Health now
        new_health: f64,
    },
    /// The items listing changed and grew.
    NewItemsListed {
        /// Station key
        key: String,
        /// Current owner
        owner: String,
        /// The new items listing
        items: String,
    },
}

impl ChangeEvent {
    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        match self {
            Self::HealthDropped { .. } => ChangeKind::HealthDropped,
            Self::NewItemsListed { .. } => ChangeKind::NewItemsListed,
        }
    }

    /// Station key the event refers to.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::HealthDropped { key, .. } | Self::NewItemsListed { key, .. } => key,
        }
    }

    /// Owner at the time of the event.
    #[must_use]
    pub fn owner(&self) -> &str {
        match self {
            Self::HealthDropped { owner, .. } | Self::NewItemsListed { owner, .. } => owner,
        }
    }
}

/// Tunables for the change rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeRules {
    /// A drop must be strictly greater than this to alert.
    pub health_drop_threshold: f64,
}

impl Default for ChangeRules {
    fn default() -> Self {
        Self {
            health_drop_threshold: defaults::HEALTH_DROP_THRESHOLD,
        }
    }
}

impl ChangeRules {
    /// Creates rules with the given health drop threshold.
    #[must_use]
    pub const fn with_threshold(health_drop_threshold: f64) -> Self {
        Self {
            health_drop_threshold,
        }
    }

    /// Compares two observations of the same base.
    ///
    /// A health drop is reported before new items.
    #[must_use]
    pub fn compare(&self, old: &TrackedEntity, new: &TrackedEntity) -> Vec<ChangeEvent> {
        let mut events = Vec::new();

        if let (Some(old_health), Some(new_health)) = (old.health, new.health) {
            if new_health < old_health && old_health - new_health > self.health_drop_threshold {
                events.push(ChangeEvent::HealthDropped {
                    key: new.key.clone(),
                    owner: new.owner.clone(),
                    old_health,
                    new_health,
                });
            }
        }

        // Length growth stands in for "items added"; removals and same-length
        // replacements go unreported.
        if new.items != old.items && new.items.chars().count() > old.items.chars().count() {
            events.push(ChangeEvent::NewItemsListed {
                key: new.key.clone(),
                owner: new.owner.clone(),
                items: new.items.clone(),
            });
        }

        events
    }
}

/// Result of diffing one payload against the previous snapshot.
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    /// Detected events in emission order.
    pub events: Vec<ChangeEvent>,
    /// Snapshot to install for the next cycle.
    pub next: Snapshot,
    /// Shape the payload was recognized as.
    pub shape: PayloadShape,
}

/// Diffs a freshly fetched payload against the previous snapshot.
///
/// This is a pure function. Entries outside the allow-list are dropped before
/// any rule runs, from the payload and from the carried-over snapshot alike.
/// Keys seen for the first time never produce events. Events follow payload
/// order; within a key the health drop comes first.
///
/// An unrecognized payload yields no events: the previous entities are kept
/// and the raw payload is stored unindexed on the next snapshot.
#[must_use]
pub fn diff(
    previous: &Snapshot,
    payload: Value,
    rules: &ChangeRules,
    allow: Option<&AllowList>,
    now: SystemTime,
) -> DiffOutcome {
    let shape = PayloadShape::detect(&payload);
    let mut next = previous.clone();
    if let Some(allow) = allow {
        next.retain_keys(|key| allow.contains(key));
    }

    if shape.is_unrecognized() {
        tracing::warn!(
            "Unknown payload shape, keeping previous snapshot and storing payload unindexed"
        );
        next.set_unindexed(Some(payload));
        return DiffOutcome {
            events: Vec::new(),
            next,
            shape,
        };
    }

    let mut events = Vec::new();
    for (key, record) in index_entries(&payload, shape).unwrap_or_default() {
        if allow.is_some_and(|a| !a.contains(&key)) {
            continue;
        }

        let entity = TrackedEntity::from_record(key, record, now);
        match previous.get(&entity.key) {
            Some(old) => events.extend(rules.compare(old, &entity)),
            None => tracing::info!("New base tracked: {}", entity.key),
        }
        next.insert(entity);
    }

    next.set_unindexed(None);
    DiffOutcome {
        events,
        next,
        shape,
    }
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
