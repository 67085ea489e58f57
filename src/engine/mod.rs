//! The poll-diff-alert engine.
//!
//! [`Engine`] owns one cycle: fetch the payload, diff it against the current
//! snapshot, install the new snapshot, and dispatch the resulting events.
//! [`PollLoop`] drives cycles on a timer until shutdown.
//!
//! At most one cycle runs at a time. Timer ticks skip while a manual check
//! holds the cycle lock; a manual check waits for a running tick to finish.

mod poll;
mod status;

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

pub use poll::{PollLoop, PollState};
pub use status::StatusReport;

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tokio::sync::{Mutex, watch};

use crate::alert::{AlertSender, DispatchReport, Dispatcher};
use crate::monitor::{AllowList, ChangeRules, Snapshot, SnapshotStore, diff};
use crate::subscription::{
    AlertType, ChannelId, GuildId, RegistryError, Subscription, SubscriptionStore,
};
use crate::time::{Clock, SystemClock};
use crate::upstream::{FetchError, PayloadFetcher, SecurityPolicyViolation};

/// Why a manual check did not run to completion.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Polling is disabled by the transport policy.
    #[error("Polling is disabled: {0}")]
    Disabled(#[source] SecurityPolicyViolation),

    /// The fetch failed; the snapshot is unchanged.
    #[error("Check failed: {0}")]
    Fetch(#[source] FetchError),
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Events detected.
    pub events: usize,
    /// Entities in the snapshot after the cycle.
    pub tracked: usize,
    /// Whether the payload shape was unrecognized.
    pub degraded: bool,
    /// Combined delivery report for every event.
    pub report: DispatchReport,
}

/// Poll-diff-alert engine.
///
/// Generic over its collaborators so tests can script payloads, deliveries
/// and time.
#[derive(Debug)]
pub struct Engine<F, R, S, C = SystemClock> {
    fetcher: F,
    dispatcher: Dispatcher<R, S>,
    snapshots: SnapshotStore,
    rules: ChangeRules,
    allow: RwLock<Option<Arc<AllowList>>>,
    clock: C,
    cycle_lock: Mutex<()>,
    state: watch::Sender<PollState>,
}

impl<F, R, S> Engine<F, R, S, SystemClock>
where
    F: PayloadFetcher,
    R: SubscriptionStore,
    S: AlertSender,
{
    /// Creates an engine using the system clock and tracking every station.
    #[must_use]
    pub fn new(fetcher: F, dispatcher: Dispatcher<R, S>, rules: ChangeRules) -> Self {
        Self::with_clock(fetcher, dispatcher, rules, SystemClock)
    }
}

impl<F, R, S, C> Engine<F, R, S, C>
where
    F: PayloadFetcher,
    R: SubscriptionStore,
    S: AlertSender,
    C: Clock,
{
    /// Creates an engine with a custom clock for observation timestamps.
    #[must_use]
    pub fn with_clock(
        fetcher: F,
        dispatcher: Dispatcher<R, S>,
        rules: ChangeRules,
        clock: C,
    ) -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            fetcher,
            dispatcher,
            snapshots: SnapshotStore::new(),
            rules,
            allow: RwLock::new(None),
            clock,
            cycle_lock: Mutex::new(()),
            state,
        }
    }

    /// Sets the initial station allow-list.
    #[must_use]
    pub fn with_allow_list(self, allow: Option<AllowList>) -> Self {
        self.set_allow_list(allow);
        self
    }

    /// Replaces the station allow-list; takes effect on the next cycle.
    pub fn set_allow_list(&self, allow: Option<AllowList>) {
        *self.allow.write().unwrap_or_else(PoisonError::into_inner) = allow.map(Arc::new);
    }

    /// Current station allow-list.
    #[must_use]
    pub fn allow_list(&self) -> Option<Arc<AllowList>> {
        self.allow
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.load()
    }

    /// Current loop state.
    #[must_use]
    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, state: PollState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::trace!("Poll state {previous:?} -> {state:?}");
        }
    }

    /// The fetcher this engine polls.
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Runs one cycle if no other cycle is running.
    ///
    /// Returns `None` when the tick was skipped because a manual check holds
    /// the cycle lock.
    pub async fn tick(&self) -> Option<Result<CycleOutcome, FetchError>> {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            tracing::debug!("Cycle already running, skipping tick");
            return None;
        };
        Some(self.run_cycle().await)
    }

    /// Runs an extra cycle now, waiting for any running cycle to finish.
    ///
    /// The poll timer is not reset.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::Disabled`] if the endpoint violates the transport
    /// policy, or [`CheckError::Fetch`] if the fetch failed.
    pub async fn check_now(&self) -> Result<CycleOutcome, CheckError> {
        self.fetcher.check_policy().map_err(CheckError::Disabled)?;
        let _guard = self.cycle_lock.lock().await;
        self.run_cycle().await.map_err(CheckError::Fetch)
    }

    /// Fetch, diff, swap, dispatch. Callers hold the cycle lock.
    async fn run_cycle(&self) -> Result<CycleOutcome, FetchError> {
        self.set_state(PollState::Fetching);
        let payload = match self.fetcher.fetch().await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Poll of {} failed: {e}", self.fetcher.endpoint());
                self.set_state(PollState::Idle);
                return Err(e);
            }
        };

        self.set_state(PollState::Diffing);
        let previous = self.snapshots.load();
        let allow = self.allow_list();
        let outcome = diff(
            &previous,
            payload,
            &self.rules,
            allow.as_deref(),
            self.clock.now(),
        );
        let degraded = outcome.shape.is_unrecognized();
        let tracked = outcome.next.len();
        self.snapshots.replace(outcome.next);

        self.set_state(PollState::Dispatching);
        let mut report = DispatchReport::default();
        for event in &outcome.events {
            tracing::info!("{} at {} (owner {})", event.kind(), event.key(), event.owner());
            report.merge(self.dispatcher.dispatch(event).await);
        }

        self.set_state(PollState::Idle);
        if outcome.events.is_empty() {
            tracing::debug!("Poll complete: {tracked} bases tracked, no changes");
        } else {
            tracing::info!(
                "Poll complete: {} event(s), delivered {}/{}",
                outcome.events.len(),
                report.delivered,
                report.attempted
            );
        }

        Ok(CycleOutcome {
            events: outcome.events.len(),
            tracked,
            degraded,
            report,
        })
    }

    /// Builds a diagnostic report without touching the network.
    #[must_use]
    pub fn debug_status(&self) -> StatusReport {
        StatusReport::collect(
            self.fetcher.endpoint(),
            self.state(),
            &self.snapshot(),
            self.allow_list().as_deref(),
        )
    }

    /// Subscribes a channel. Returns `false` if it was already subscribed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the registry cannot be updated.
    pub async fn subscribe(
        &self,
        guild: GuildId,
        channel: ChannelId,
        alert_type: AlertType,
    ) -> Result<bool, RegistryError> {
        let added = self
            .dispatcher
            .registry()
            .add_with_type(guild, channel, alert_type)
            .await?;
        if added {
            tracing::info!("Channel {channel} in guild {guild} subscribed ({alert_type})");
        }
        Ok(added)
    }

    /// Unsubscribes a channel; unknown channels are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the registry cannot be updated.
    pub async fn unsubscribe(&self, channel: ChannelId) -> Result<(), RegistryError> {
        self.dispatcher.registry().remove(channel).await?;
        tracing::info!("Channel {channel} unsubscribed");
        Ok(())
    }

    /// Current subscriptions.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the registry cannot be read.
    pub async fn subscriptions(&self) -> Result<Vec<Subscription>, RegistryError> {
        self.dispatcher.registry().subscriptions().await
    }
}
