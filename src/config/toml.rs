//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Upstream endpoint section
    #[serde(default)]
    pub upstream: UpstreamSection,

    /// Alert rules section
    #[serde(default)]
    pub alerts: AlertsSection,

    /// Delivery section
    #[serde(default)]
    pub discord: DiscordSection,

    /// Subscription storage section
    #[serde(default)]
    pub storage: StorageSection,
}

/// Upstream endpoint configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamSection {
    /// Status endpoint URL
    pub endpoint: Option<String>,

    /// Polling interval in seconds
    pub poll_interval: Option<u64>,

    /// Request timeout in seconds
    pub request_timeout: Option<u64>,

    /// Verify the endpoint's TLS certificate
    pub tls_verify: Option<bool>,

    /// Extra PEM root certificate
    pub ca_file: Option<String>,

    /// Permit a plain http endpoint
    #[serde(default)]
    pub allow_insecure_http: bool,
}

/// Alert rules configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertsSection {
    /// Health drop threshold in points
    pub health_threshold: Option<f64>,

    /// Station allow-list (empty = all stations)
    #[serde(default)]
    pub stations: Vec<String>,

    /// Remove subscriptions of channels that no longer exist
    pub prune_deleted_channels: Option<bool>,
}

/// Delivery configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordSection {
    /// Bot token
    pub token: Option<String>,

    /// REST API base URL
    pub api_base: Option<String>,
}

/// Subscription storage configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    /// Registry file path
    pub subscriptions: Option<String>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# basewatch Configuration File

[upstream]
# Status endpoint returning JSON (required)
# endpoint = "https://status.example.com/api/stations"

# Polling interval in seconds (default: 60)
poll_interval = 60

# Request timeout in seconds (default: 10)
request_timeout = 10

# Verify the endpoint's TLS certificate (default: true)
# Turning this off is logged as a warning on every start.
# tls_verify = true

# Extra PEM root certificate for self-signed endpoints
# ca_file = "~/certs/status-ca.pem"

# Permit a plain http endpoint (default: false)
# allow_insecure_http = false

[alerts]
# Alert when health drops by more than this many points (default: 5.0)
health_threshold = 5.0

# Stations to track (empty = all). "*" is a wildcard.
# Note: --stations on the CLI REPLACES this list (not merged)
# stations = ["Freeport 7", "Pirate*"]

# Remove subscriptions of channels that were deleted (default: true)
# prune_deleted_channels = true

[discord]
# Bot token. Prefer the DISCORD_TOKEN environment variable.
# token = "your-token-here"

# REST API base (default: https://discord.com/api/v10)
# api_base = "https://discord.com/api/v10"

[storage]
# Subscription registry file (default: subscriptions.json)
# subscriptions = "subscriptions.json"
"#
    .to_string()
}
