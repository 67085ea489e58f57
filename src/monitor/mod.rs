//! Monitor layer: turning upstream payloads into change events.
//!
//! This module provides types and functions for:
//! - Per-base state ([`TrackedEntity`]) and the cached view ([`Snapshot`], [`SnapshotStore`])
//! - The station allow-list ([`AllowList`])
//! - Payload shape detection and filtering ([`PayloadShape`], [`filter_allowed`])
//! - Change rules and the differ ([`ChangeRules`], [`ChangeEvent`], [`diff`])

mod allow;
mod change;
mod entity;
mod shape;
mod snapshot;

pub use allow::AllowList;
pub use change::{ChangeEvent, ChangeKind, ChangeRules, DiffOutcome, diff};
pub use entity::{TrackedEntity, UNKNOWN_OWNER};
pub use shape::{IdField, PayloadShape, filter_allowed, index_entries, record_key};
pub use snapshot::{Snapshot, SnapshotStore};
