//! Application execution logic.
//!
//! This module wires the configured collaborators into an [`Engine`], runs
//! the poll loop until a shutdown signal, and implements the one-shot
//! subcommands.

use std::fmt::Write as _;
use std::sync::Arc;

use thiserror::Error;
use tokio::signal;

use basewatch::alert::{
    Alert, AlertRenderer, AlertSender, DeliveryError, DiscordSender, Dispatcher, LogSender,
    RenderError,
};
use basewatch::config::{Command, ValidatedConfig};
use basewatch::engine::{CheckError, CycleOutcome, Engine, PollLoop, StatusReport};
use basewatch::http::{ClientBuildError, ReqwestClient, TlsOptions};
use basewatch::subscription::{
    ChannelId, FileSubscriptionStore, GuildId, RegistryError, SubscriptionStore,
};
use basewatch::upstream::UpstreamFetcher;

/// Type alias for the application's engine.
type AppEngine = Engine<UpstreamFetcher<ReqwestClient>, FileSubscriptionStore, AppSender>;

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// Failed to build an HTTP client.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] ClientBuildError),

    /// The alert templates failed to compile.
    #[error("Failed to load alert templates: {0}")]
    Templates(#[source] RenderError),

    /// The subscription registry could not be read or written.
    #[error("Subscription registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A manual check did not complete.
    #[error(transparent)]
    Check(#[from] CheckError),
}

/// Alert sender selected at startup.
#[derive(Debug)]
pub enum AppSender {
    /// Posts to Discord.
    Discord(DiscordSender<ReqwestClient>),
    /// Logs alerts instead of sending them.
    Log(LogSender),
}

impl AlertSender for AppSender {
    async fn send(&self, channel: ChannelId, alert: &Alert) -> Result<(), DeliveryError> {
        match self {
            Self::Discord(sender) => sender.send(channel, alert).await,
            Self::Log(sender) => sender.send(channel, alert).await,
        }
    }
}

/// Executes the main application loop.
///
/// This function:
/// 1. Builds the upstream fetcher, alert sender and subscription registry
/// 2. Installs the manual-check signal handler (SIGUSR1, Unix only)
/// 3. Runs the poll loop until shutdown signal (Ctrl+C or SIGTERM)
///
/// A disabled endpoint does not end the process; the loop waits for
/// shutdown in the `Disabled` state.
///
/// # Errors
///
/// Returns an error if an HTTP client or the alert templates cannot be built.
///
/// # Coverage Note
///
/// This function is excluded from coverage because it requires OS signal
/// handling and a live endpoint.
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig) -> Result<(), RunError> {
    let engine = Arc::new(build_engine(&config)?);

    if config.dry_run {
        tracing::info!("Dry-run mode enabled - alerts will be logged but not sent");
    }
    log_registry(&engine, &config).await;

    #[cfg(unix)]
    tokio::spawn(check_on_signal(Arc::clone(&engine)));

    let state = PollLoop::new(Arc::clone(&engine), config.poll_interval)
        .run(shutdown_signal())
        .await;
    tracing::debug!("Poll loop finished in state {state}");

    Ok(())
}

/// Runs a single cycle and returns its outcome with the resulting status.
///
/// The snapshot starts empty, so this never delivers alerts; it verifies the
/// endpoint, the payload shape and the allow-list.
///
/// # Errors
///
/// Returns an error if the engine cannot be built, the endpoint is disabled
/// by the transport policy, or the fetch fails.
pub async fn check(config: &ValidatedConfig) -> Result<(CycleOutcome, StatusReport), RunError> {
    let engine = build_engine(config)?;
    let outcome = engine.check_now().await?;
    Ok((outcome, engine.debug_status()))
}

/// Executes a registry subcommand and returns the text to print.
///
/// Commands that are not registry commands produce no output.
///
/// # Errors
///
/// Returns an error if the registry cannot be read or written.
pub async fn registry_command<R: SubscriptionStore>(
    store: &R,
    command: &Command,
) -> Result<String, RunError> {
    let output = match command {
        Command::Subscribe {
            guild,
            channel,
            alert_type,
        } => {
            let channel = ChannelId(*channel);
            if store
                .add_with_type(GuildId(*guild), channel, *alert_type)
                .await?
            {
                format!("Subscribed channel {channel} to {alert_type} alerts")
            } else {
                format!("Channel {channel} is already subscribed")
            }
        }
        Command::Unsubscribe { channel } => {
            let channel = ChannelId(*channel);
            store.remove(channel).await?;
            format!("Unsubscribed channel {channel}")
        }
        Command::List => {
            let subscriptions = store.subscriptions().await?;
            if subscriptions.is_empty() {
                "No channels subscribed".to_string()
            } else {
                let mut out = String::new();
                for sub in &subscriptions {
                    let _ = writeln!(
                        out,
                        "{} (guild {}, {} alerts)",
                        sub.channel_id, sub.guild_id, sub.alert_type
                    );
                }
                out.trim_end().to_string()
            }
        }
        Command::Init { .. } | Command::Check => String::new(),
    };

    Ok(output)
}

/// Builds the engine from configuration.
fn build_engine(config: &ValidatedConfig) -> Result<AppEngine, RunError> {
    let registry = FileSubscriptionStore::new(config.subscriptions_file.clone());
    let renderer = AlertRenderer::new().map_err(RunError::Templates)?;
    let dispatcher = Dispatcher::new(registry, create_sender(config)?, renderer)
        .with_prune_deleted_channels(config.prune_deleted_channels);

    Ok(Engine::new(create_fetcher(config)?, dispatcher, config.rules)
        .with_allow_list(config.stations.clone()))
}

/// Creates the upstream fetcher with the configured TLS options.
fn create_fetcher(config: &ValidatedConfig) -> Result<UpstreamFetcher<ReqwestClient>, RunError> {
    let client = ReqwestClient::with_tls(&config.tls, config.request_timeout)
        .map_err(RunError::ClientBuild)?;

    Ok(
        UpstreamFetcher::new(client, config.endpoint.clone(), config.request_timeout)
            .with_allow_insecure_http(config.allow_insecure_http),
    )
}

/// Creates the alert sender; dry runs and missing tokens only log.
///
/// The delivery client always verifies certificates; the upstream TLS
/// options do not apply to Discord.
fn create_sender(config: &ValidatedConfig) -> Result<AppSender, RunError> {
    match (&config.token, config.dry_run) {
        (Some(token), false) => {
            let client = ReqwestClient::with_tls(&TlsOptions::default(), config.request_timeout)
                .map_err(RunError::ClientBuild)?;
            Ok(AppSender::Discord(DiscordSender::new(
                client,
                config.api_base.clone(),
                token.clone(),
            )))
        }
        _ => Ok(AppSender::Log(LogSender)),
    }
}

/// Logs the registry location and subscriber count at startup.
async fn log_registry(engine: &AppEngine, config: &ValidatedConfig) {
    match engine.subscriptions().await {
        Ok(subscriptions) => tracing::info!(
            "{} channel(s) subscribed (registry: {})",
            subscriptions.len(),
            config.subscriptions_file.display()
        ),
        Err(e) => tracing::error!("{e}; alerts will be dropped until the registry is fixed"),
    }
}

/// Runs a manual check and logs the status report on every SIGUSR1.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
#[cfg(unix)]
async fn check_on_signal(engine: Arc<AppEngine>) {
    let mut signals = match signal::unix::signal(signal::unix::SignalKind::user_defined1()) {
        Ok(signals) => signals,
        Err(e) => {
            tracing::warn!("Failed to install SIGUSR1 handler, manual checks disabled: {e}");
            return;
        }
    };

    while signals.recv().await.is_some() {
        tracing::info!("Manual check requested");
        match engine.check_now().await {
            Ok(outcome) => tracing::info!(
                "Manual check complete: {} event(s), {} bases tracked",
                outcome.events,
                outcome.tracked
            ),
            Err(e) => tracing::warn!("{e}"),
        }
        tracing::info!("Status:\n{}", engine.debug_status());
    }
}

/// Returns a future that completes when a shutdown signal is received.
///
/// A handler that cannot be installed is logged and never fires.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
