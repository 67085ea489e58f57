//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.
//! Every option except `--verbose` can also come from a `BASEWATCH_*`
//! environment variable; the token uses `DISCORD_TOKEN`. Flags read their
//! variable as a boolean (`1`, `true`, `yes`, `on` and their negations).

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};

use crate::subscription::AlertType;

/// basewatch: station status poller with chat alerts
///
/// Polls a JSON status endpoint, detects base health drops and new item
/// listings, and broadcasts alerts to subscribed channels.
#[derive(Debug, Parser)]
#[command(name = "basewatch")]
#[command(version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)] // CLI flags are naturally boolean
pub struct Cli {
    /// Subcommand to run (default: run the poll loop)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Upstream status endpoint (required for run and check)
    #[arg(long, env = "BASEWATCH_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Bot token for alert delivery (required unless --dry-run)
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Polling interval in seconds
    #[arg(long = "poll-interval", env = "BASEWATCH_POLL_INTERVAL", global = true)]
    pub poll_interval: Option<u64>,

    /// Upstream request timeout in seconds
    #[arg(long = "request-timeout", env = "BASEWATCH_REQUEST_TIMEOUT", global = true)]
    pub request_timeout: Option<u64>,

    /// Skip upstream TLS certificate verification (logged loudly)
    #[arg(
        long = "no-tls-verify",
        env = "BASEWATCH_NO_TLS_VERIFY",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub no_tls_verify: bool,

    /// Extra PEM root certificate for the upstream endpoint
    #[arg(long = "ca-file", env = "BASEWATCH_CA_FILE", global = true)]
    pub ca_file: Option<PathBuf>,

    /// Permit a plain http upstream endpoint
    #[arg(
        long = "allow-insecure-http",
        env = "BASEWATCH_ALLOW_INSECURE_HTTP",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub allow_insecure_http: bool,

    /// Health drop (in points) that must be exceeded to alert
    #[arg(long = "health-threshold", env = "BASEWATCH_HEALTH_THRESHOLD", global = true)]
    pub health_threshold: Option<f64>,

    /// Comma-separated station allow-list; `*` is a wildcard (default: all)
    #[arg(long, value_name = "LIST", env = "BASEWATCH_STATIONS", global = true)]
    pub stations: Option<String>,

    /// Path to the subscription registry file
    #[arg(long, env = "BASEWATCH_SUBSCRIPTIONS", global = true)]
    pub subscriptions: Option<PathBuf>,

    /// Delivery API base URL
    #[arg(long = "api-base", env = "BASEWATCH_API_BASE", global = true)]
    pub api_base: Option<String>,

    /// Path to configuration file
    #[arg(long, short, env = "BASEWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Test mode - log alerts instead of delivering them
    #[arg(
        long,
        env = "BASEWATCH_DRY_RUN",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// Subcommands for basewatch
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = "basewatch.toml")]
        output: PathBuf,
    },

    /// Start sending alerts to a channel
    Subscribe {
        /// Guild (server) id
        guild: u64,
        /// Channel id
        channel: u64,
        /// Which alerts to send: all, health or items
        #[arg(long = "alert-type", default_value = "all")]
        alert_type: AlertType,
    },

    /// Stop sending alerts to a channel
    Unsubscribe {
        /// Channel id
        channel: u64,
    },

    /// List subscribed channels
    List,

    /// Run one poll cycle now and print a status report
    Check,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Parses CLI arguments, returning clap's error instead of exiting.
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid arguments.
    pub fn try_parse_from_iter<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(iter)
    }
}
