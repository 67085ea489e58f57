//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::http::TlsOptions;
use crate::monitor::{AllowList, ChangeRules};

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::TomlConfig;

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Upstream status endpoint (required)
    pub endpoint: Url,

    /// Bot token; `None` only in dry-run mode
    pub token: Option<String>,

    /// Delivery API base URL
    pub api_base: Url,

    /// Polling interval
    pub poll_interval: Duration,

    /// Upstream request timeout
    pub request_timeout: Duration,

    /// Upstream TLS settings
    pub tls: TlsOptions,

    /// Whether a plain http endpoint is permitted
    pub allow_insecure_http: bool,

    /// Change rule tunables
    pub rules: ChangeRules,

    /// Station allow-list; `None` tracks every station
    pub stations: Option<AllowList>,

    /// Subscription registry file
    pub subscriptions_file: PathBuf,

    /// Remove subscriptions of deleted channels
    pub prune_deleted_channels: bool,

    /// Dry-run mode (log alerts without delivering them)
    pub dry_run: bool,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stations = self
            .stations
            .as_ref()
            .map_or_else(|| "all".to_string(), ToString::to_string);

        write!(
            f,
            "Config {{ endpoint: {}, poll_interval: {}s, request_timeout: {}s, tls_verify: {}, \
             health_threshold: {}, stations: {}, subscriptions: {}, token: {}, dry_run: {} }}",
            self.endpoint,
            self.poll_interval.as_secs(),
            self.request_timeout.as_secs(),
            self.tls.verify,
            self.rules.health_drop_threshold,
            stations,
            self.subscriptions_file.display(),
            if self.token.is_some() { "set" } else { "unset" },
            self.dry_run,
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments (and their environment variables) take precedence over
    /// TOML config values, which take precedence over built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required fields are missing (`endpoint`, and `token` outside dry-run)
    /// - A URL is invalid
    /// - A station wildcard is invalid
    /// - The health threshold is negative or not finite
    /// - Duration values are zero
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let endpoint = Self::resolve_endpoint(cli, toml)?;
        let token = Self::resolve_token(cli, toml)?;
        let api_base = Self::resolve_api_base(cli, toml)?;

        let poll_interval = resolve_secs(
            "poll_interval",
            cli.poll_interval,
            toml.and_then(|t| t.upstream.poll_interval),
            defaults::POLL_INTERVAL_SECS,
        )?;
        let request_timeout = resolve_secs(
            "request_timeout",
            cli.request_timeout,
            toml.and_then(|t| t.upstream.request_timeout),
            defaults::REQUEST_TIMEOUT_SECS,
        )?;

        // Flags only disable: --no-tls-verify or tls_verify = false both win
        let tls = TlsOptions {
            verify: !cli.no_tls_verify
                && toml.and_then(|t| t.upstream.tls_verify).unwrap_or(true),
            ca_file: cli
                .ca_file
                .clone()
                .or_else(|| toml.and_then(|t| t.upstream.ca_file.as_ref().map(PathBuf::from)))
                .map(|p| expand_tilde(&p)),
        };

        let allow_insecure_http =
            cli.allow_insecure_http || toml.is_some_and(|t| t.upstream.allow_insecure_http);

        let rules = Self::resolve_rules(cli, toml)?;
        let stations = Self::resolve_stations(cli, toml)?;

        let prune_deleted_channels = toml
            .and_then(|t| t.alerts.prune_deleted_channels)
            .unwrap_or(defaults::PRUNE_DELETED_CHANNELS);

        Ok(Self {
            endpoint,
            token,
            api_base,
            poll_interval,
            request_timeout,
            tls,
            allow_insecure_http,
            rules,
            stations,
            subscriptions_file: subscriptions_path(cli, toml),
            prune_deleted_channels,
            dry_run: cli.dry_run,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = load_toml(cli)?;
        Self::from_raw(cli, toml.as_ref())
    }

    fn resolve_endpoint(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Url, ConfigError> {
        let raw = cli
            .endpoint
            .as_deref()
            .or_else(|| toml.and_then(|t| t.upstream.endpoint.as_deref()))
            .ok_or_else(|| {
                ConfigError::missing(
                    field::ENDPOINT,
                    "Use --endpoint, BASEWATCH_ENDPOINT or set upstream.endpoint in config file",
                )
            })?;

        parse_url(field::ENDPOINT, raw)
    }

    fn resolve_token(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Option<String>, ConfigError> {
        let token = cli
            .token
            .as_deref()
            .or_else(|| toml.and_then(|t| t.discord.token.as_deref()))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToString::to_string);

        if token.is_none() && !cli.dry_run {
            return Err(ConfigError::missing(
                field::TOKEN,
                "Set DISCORD_TOKEN, use --token, or set discord.token in config file \
                 (or run with --dry-run)",
            ));
        }

        Ok(token)
    }

    fn resolve_api_base(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Url, ConfigError> {
        let raw = cli
            .api_base
            .as_deref()
            .or_else(|| toml.and_then(|t| t.discord.api_base.as_deref()))
            .unwrap_or(defaults::DISCORD_API_BASE);

        parse_url(field::API_BASE, raw)
    }

    fn resolve_rules(cli: &Cli, toml: Option<&TomlConfig>) -> Result<ChangeRules, ConfigError> {
        let threshold = cli
            .health_threshold
            .or_else(|| toml.and_then(|t| t.alerts.health_threshold))
            .unwrap_or(defaults::HEALTH_DROP_THRESHOLD);

        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        Ok(ChangeRules::with_threshold(threshold))
    }

    fn resolve_stations(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<Option<AllowList>, ConfigError> {
        // CLI list replaces the TOML list entirely
        let list = match (&cli.stations, toml) {
            (Some(csv), _) => AllowList::parse(csv),
            (None, Some(t)) => AllowList::new(&t.alerts.stations),
            (None, None) => return Ok(None),
        }
        .map_err(ConfigError::InvalidAllowList)?;

        Ok((!list.is_empty()).then_some(list))
    }
}

/// Loads the TOML file named by `--config`, if any.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_toml(cli: &Cli) -> Result<Option<TomlConfig>, ConfigError> {
    cli.config
        .as_deref()
        .map(|path| TomlConfig::load(&expand_tilde(path)))
        .transpose()
}

/// Resolves the subscription registry path without validating anything else.
///
/// Registry subcommands only need this, not a full [`ValidatedConfig`].
#[must_use]
pub fn subscriptions_path(cli: &Cli, toml: Option<&TomlConfig>) -> PathBuf {
    let path = cli
        .subscriptions
        .clone()
        .or_else(|| toml.and_then(|t| t.storage.subscriptions.as_ref().map(PathBuf::from)))
        .unwrap_or_else(|| PathBuf::from(defaults::SUBSCRIPTIONS_FILE));

    expand_tilde(&path)
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

// Helper functions

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        field,
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

fn resolve_secs(
    field: &'static str,
    cli: Option<u64>,
    toml: Option<u64>,
    default: u64,
) -> Result<Duration, ConfigError> {
    // Priority: CLI explicit > TOML > default
    let seconds = cli.or(toml).unwrap_or(default);

    if seconds == 0 {
        return Err(ConfigError::InvalidDuration {
            field,
            reason: "must be greater than 0".to_string(),
        });
    }

    Ok(Duration::from_secs(seconds))
}

/// Expands a leading `~` to the home directory; other paths are unchanged.
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest))
}
