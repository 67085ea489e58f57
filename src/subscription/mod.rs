//! Subscription registry: which chat channels receive alerts.
//!
//! This module provides the registry contract ([`SubscriptionStore`]) shared
//! by admin commands and the alert dispatcher, plus two implementations:
//! an in-memory store ([`MemorySubscriptionStore`]) and a JSON file store
//! ([`FileSubscriptionStore`]).
//!
//! Subscriptions are unique on `(guild_id, channel_id)`. Adding twice is not
//! an error, and neither is removing something that is not there.

mod file;
mod memory;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

pub use file::FileSubscriptionStore;
pub use memory::MemorySubscriptionStore;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitor::ChangeKind;

/// Chat server (guild) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(pub u64);

/// Delivery channel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which alerts a channel wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    /// Every alert.
    #[default]
    All,
    /// Health drops only.
    Health,
    /// New item listings only.
    Items,
}

impl AlertType {
    /// Returns `true` if a subscription of this type receives the event kind.
    #[must_use]
    pub const fn accepts(self, kind: ChangeKind) -> bool {
        matches!(
            (self, kind),
            (Self::All, _)
                | (Self::Health, ChangeKind::HealthDropped)
                | (Self::Items, ChangeKind::NewItemsListed)
        )
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Health => "health",
            Self::Items => "items",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "health" => Ok(Self::Health),
            "items" | "goods" => Ok(Self::Items),
            other => Err(format!(
                "unknown alert type '{other}': expected all, health or items"
            )),
        }
    }
}

/// One registered delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Guild the channel belongs to.
    pub guild_id: GuildId,
    /// Channel receiving alerts.
    pub channel_id: ChannelId,
    /// Alert filter.
    #[serde(default)]
    pub alert_type: AlertType,
    /// Unix seconds when the subscription was created.
    #[serde(default)]
    pub created_at: u64,
}

/// Errors from registry storage.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry file exists but could not be read.
    #[error("Failed to read subscriptions file '{}': {source}", path.display())]
    Read {
        /// Registry path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The registry file is unreadable as a subscription list.
    ///
    /// Never overwritten automatically; an operator has to fix or remove it.
    #[error("Subscriptions file '{}' is corrupted: {reason}", path.display())]
    Corrupted {
        /// Registry path
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },

    /// The registry file could not be written.
    #[error("Failed to write subscriptions file '{}': {source}", path.display())]
    Write {
        /// Registry path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The registry lock file could not be opened or locked.
    #[error("Failed to lock subscriptions file '{}': {source}", path.display())]
    Lock {
        /// Lock file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Serializing the registry failed.
    #[error("Failed to serialize subscriptions: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The blocking storage task panicked or was cancelled.
    #[error("Subscription storage task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
}

/// Registry contract shared by command handlers and the dispatcher.
///
/// Implementations must be safe under concurrent calls; the dispatcher reads
/// while admin commands write.
pub trait SubscriptionStore: Send + Sync {
    /// Subscribes a channel with the given alert type.
    ///
    /// Returns `true` if newly added, `false` if `(guild, channel)` was
    /// already subscribed (the existing record is left untouched).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the backing storage fails.
    fn add_with_type(
        &self,
        guild: GuildId,
        channel: ChannelId,
        alert_type: AlertType,
    ) -> impl std::future::Future<Output = Result<bool, RegistryError>> + Send;

    /// Subscribes a channel to all alerts. See [`Self::add_with_type`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the backing storage fails.
    fn add(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> impl std::future::Future<Output = Result<bool, RegistryError>> + Send {
        self.add_with_type(guild, channel, AlertType::All)
    }

    /// Removes every subscription of the channel. Removing an unknown channel
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the backing storage fails.
    fn remove(
        &self,
        channel: ChannelId,
    ) -> impl std::future::Future<Output = Result<(), RegistryError>> + Send;

    /// Returns all subscriptions in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the backing storage fails.
    fn subscriptions(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Subscription>, RegistryError>> + Send;

    /// Returns the subscribed channel ids in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the backing storage fails.
    fn list(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ChannelId>, RegistryError>> + Send {
        async move {
            let subscriptions = self.subscriptions().await?;
            Ok(subscriptions.into_iter().map(|s| s.channel_id).collect())
        }
    }
}

/// Inserts a subscription unless `(guild, channel)` already exists.
fn insert_unique(subscriptions: &mut Vec<Subscription>, candidate: Subscription) -> bool {
    let exists = subscriptions
        .iter()
        .any(|s| s.guild_id == candidate.guild_id && s.channel_id == candidate.channel_id);
    if !exists {
        subscriptions.push(candidate);
    }
    !exists
}

/// Removes all subscriptions of a channel; returns `true` if any were removed.
fn remove_channel(subscriptions: &mut Vec<Subscription>, channel: ChannelId) -> bool {
    let before = subscriptions.len();
    subscriptions.retain(|s| s.channel_id != channel);
    subscriptions.len() != before
}
