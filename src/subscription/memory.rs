//! In-memory subscription store.

use std::sync::{Mutex, PoisonError};

use super::{
    AlertType, ChannelId, GuildId, RegistryError, Subscription, SubscriptionStore, insert_unique,
    remove_channel,
};
use crate::time::{Clock, SystemClock, unix_seconds};

/// Volatile [`SubscriptionStore`]; contents are lost on restart.
///
/// Used by `--dry-run` style setups and as the test double for the
/// dispatcher and engine.
#[derive(Debug, Default)]
pub struct MemorySubscriptionStore<C = SystemClock> {
    clock: C,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl MemorySubscriptionStore<SystemClock> {
    /// Creates an empty store using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> MemorySubscriptionStore<C> {
    /// Creates an empty store with a custom clock for `created_at`.
    #[must_use]
    pub const fn with_clock(clock: C) -> Self {
        Self {
            clock,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock> SubscriptionStore for MemorySubscriptionStore<C> {
    async fn add_with_type(
        &self,
        guild: GuildId,
        channel: ChannelId,
        alert_type: AlertType,
    ) -> Result<bool, RegistryError> {
        let candidate = Subscription {
            guild_id: guild,
            channel_id: channel,
            alert_type,
            created_at: unix_seconds(self.clock.now()),
        };
        Ok(insert_unique(&mut self.locked(), candidate))
    }

    async fn remove(&self, channel: ChannelId) -> Result<(), RegistryError> {
        remove_channel(&mut self.locked(), channel);
        Ok(())
    }

    async fn subscriptions(&self) -> Result<Vec<Subscription>, RegistryError> {
        Ok(self.locked().clone())
    }
}
