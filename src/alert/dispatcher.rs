//! Fan-out of one change event to every subscribed channel.

use super::{AlertRenderer, AlertSender, DeliveryError};
use crate::monitor::ChangeEvent;
use crate::subscription::{ChannelId, SubscriptionStore};

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Deliveries attempted.
    pub attempted: usize,
    /// Deliveries that succeeded.
    pub delivered: usize,
    /// Channels that did not get the alert, with the reason.
    pub failed: Vec<(ChannelId, String)>,
}

impl DispatchReport {
    /// Returns `true` if every attempted delivery succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Adds another report's counts to this one.
    pub fn merge(&mut self, other: Self) {
        self.attempted += other.attempted;
        self.delivered += other.delivered;
        self.failed.extend(other.failed);
    }
}

/// Renders alerts and delivers them to the current subscribers.
///
/// The subscriber list is read from the registry on every dispatch, so
/// subscriptions added or removed between cycles take effect immediately.
#[derive(Debug)]
pub struct Dispatcher<R, S> {
    registry: R,
    sender: S,
    renderer: AlertRenderer,
    prune_deleted_channels: bool,
}

impl<R: SubscriptionStore, S: AlertSender> Dispatcher<R, S> {
    /// Creates a dispatcher that prunes deleted channels.
    #[must_use]
    pub const fn new(registry: R, sender: S, renderer: AlertRenderer) -> Self {
        Self {
            registry,
            sender,
            renderer,
            prune_deleted_channels: true,
        }
    }

    /// Sets whether channels reported gone are removed from the registry.
    #[must_use]
    pub const fn with_prune_deleted_channels(mut self, prune: bool) -> Self {
        self.prune_deleted_channels = prune;
        self
    }

    /// The registry this dispatcher reads from.
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// The sender alerts go through.
    pub const fn sender(&self) -> &S {
        &self.sender
    }

    /// Delivers one event to every subscriber that wants its kind.
    ///
    /// Never fails as a whole: render and registry errors are logged and
    /// yield an empty report, delivery errors are recorded per channel.
    pub async fn dispatch(&self, event: &ChangeEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        let alert = match self.renderer.render(event) {
            Ok(alert) => alert,
            Err(e) => {
                tracing::error!("Skipping alert for {}: {e}", event.key());
                return report;
            }
        };

        let subscriptions = match self.registry.subscriptions().await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                tracing::error!(
                    "Cannot read subscriptions, alert for {} dropped: {e}",
                    event.key()
                );
                return report;
            }
        };

        let kind = event.kind();
        for subscription in subscriptions.iter().filter(|s| s.alert_type.accepts(kind)) {
            let channel = subscription.channel_id;
            report.attempted += 1;

            match self.sender.send(channel, &alert).await {
                Ok(()) => {
                    report.delivered += 1;
                    tracing::debug!(
                        "Delivered {kind} alert for {} to channel {channel}",
                        event.key()
                    );
                }
                Err(e) => {
                    self.handle_failure(channel, &e).await;
                    report.failed.push((channel, e.to_string()));
                }
            }
        }

        if !report.is_clean() {
            tracing::warn!(
                "Alert for {} delivered to {}/{} channels",
                event.key(),
                report.delivered,
                report.attempted
            );
        }

        report
    }

    async fn handle_failure(&self, channel: ChannelId, error: &DeliveryError) {
        match error {
            DeliveryError::Forbidden => {
                tracing::warn!("Missing permission for channel {channel}, skipping");
            }
            DeliveryError::ChannelGone if self.prune_deleted_channels => {
                match self.registry.remove(channel).await {
                    Ok(()) => tracing::info!("Channel {channel} is gone, subscription removed"),
                    Err(e) => tracing::warn!("Channel {channel} is gone but removal failed: {e}"),
                }
            }
            other => tracing::warn!("Failed to deliver alert to channel {channel}: {other}"),
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
