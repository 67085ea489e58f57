//! Timer-driven poll loop.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::Engine;
use crate::alert::AlertSender;
use crate::subscription::SubscriptionStore;
use crate::time::Clock;
use crate::upstream::PayloadFetcher;

/// Where the poll loop currently is.
///
/// `Fetching`, `Diffing` and `Dispatching` are the phases of one cycle and
/// always return to `Idle`. `Disabled` means the endpoint failed the
/// transport policy at startup; only shutdown leaves it. `Stopped` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollState {
    /// Waiting for the next tick.
    Idle,
    /// Fetching the upstream payload.
    Fetching,
    /// Diffing the payload against the snapshot.
    Diffing,
    /// Delivering alerts.
    Dispatching,
    /// Polling refused by the transport policy.
    Disabled,
    /// Shut down.
    Stopped,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Diffing => "diffing",
            Self::Dispatching => "dispatching",
            Self::Disabled => "disabled",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Drives [`Engine`] cycles at a fixed cadence until shutdown.
///
/// The first cycle runs immediately. Ticks missed while a cycle overran are
/// skipped, not queued. Shutdown is checked with priority while waiting for
/// a tick; a cycle already in flight runs to completion first, so its
/// snapshot update and alerts are never half-applied. The fetch timeout
/// bounds how long that can take.
#[derive(Debug)]
pub struct PollLoop<F, R, S, C> {
    engine: Arc<Engine<F, R, S, C>>,
    interval: Duration,
}

impl<F, R, S, C> PollLoop<F, R, S, C>
where
    F: PayloadFetcher,
    R: SubscriptionStore,
    S: AlertSender,
    C: Clock,
{
    /// Creates a loop polling every `interval`.
    #[must_use]
    pub const fn new(engine: Arc<Engine<F, R, S, C>>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Runs until `shutdown` completes and returns the final state.
    pub async fn run<Sd>(self, shutdown: Sd) -> PollState
    where
        Sd: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let engine = &self.engine;

        if let Err(violation) = engine.fetcher().check_policy() {
            tracing::error!("Polling disabled: {violation}");
            engine.set_state(PollState::Disabled);
            shutdown.await;
            tracing::info!("Shutdown signal received, stopping...");
            engine.set_state(PollState::Stopped);
            return PollState::Stopped;
        }

        tracing::info!(
            "Polling {} every {}s",
            engine.fetcher().endpoint(),
            self.interval.as_secs()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => break,

                _ = ticker.tick() => {}
            }

            // Errors are logged by the engine; the next tick is the retry.
            let _ = engine.tick().await;
        }

        tracing::info!("Shutdown signal received, stopping...");
        engine.set_state(PollState::Stopped);
        PollState::Stopped
    }
}
