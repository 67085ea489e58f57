//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use std::time::Duration;

/// Default polling interval in seconds.
pub const POLL_INTERVAL_SECS: u64 = 60;

/// Default upstream request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// A health drop must exceed this many points to alert.
pub const HEALTH_DROP_THRESHOLD: f64 = 5.0;

/// Default Discord REST API base.
pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Default subscription registry file.
pub const SUBSCRIPTIONS_FILE: &str = "subscriptions.json";

/// Default configuration file written by `init`.
pub const CONFIG_FILE: &str = "basewatch.toml";

/// Whether channels reported deleted are removed from the registry.
pub const PRUNE_DELETED_CHANNELS: bool = true;

/// Environment variable holding the bot token.
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";

/// Default polling interval as Duration.
#[must_use]
pub const fn poll_interval() -> Duration {
    Duration::from_secs(POLL_INTERVAL_SECS)
}

/// Default upstream request timeout as Duration.
#[must_use]
pub const fn request_timeout() -> Duration {
    Duration::from_secs(REQUEST_TIMEOUT_SECS)
}
