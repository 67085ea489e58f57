//! Application startup and utilities.
//!
//! This module contains exit codes, tracing setup, and error hints
//! that support the main entry point.

use basewatch::config::{ConfigError, field};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Application exit codes.
pub mod exit_code {
    use std::process::ExitCode;

    /// Success (exit code 0).
    pub const SUCCESS: ExitCode = ExitCode::SUCCESS;

    /// Configuration error (exit code 1) - missing endpoint or token, bad values.
    pub const CONFIG_ERROR: ExitCode = ExitCode::FAILURE;

    /// Runtime error (exit code 2) - unreadable registry, failed check.
    ///
    /// Note: This is a function rather than a constant because `ExitCode::from()` is not `const fn`.
    pub fn runtime_error() -> ExitCode {
        ExitCode::from(2)
    }
}

/// Prints helpful hints for common configuration errors.
pub fn print_config_hint(error: &ConfigError) {
    let hint = match error {
        ConfigError::MissingRequired { field: f, .. } if *f == field::TOKEN => {
            "Set DISCORD_TOKEN, or pass --dry-run to log alerts without sending them."
        }
        ConfigError::MissingRequired { .. } | ConfigError::FileRead { .. } => {
            "Run 'basewatch init' to generate a configuration template."
        }
        ConfigError::InvalidUrl { field: f, .. } if *f == field::ENDPOINT => {
            "The endpoint must be an absolute URL such as https://example.com/api/pob_goods."
        }
        ConfigError::InvalidAllowList(_) => {
            "Stations are comma-separated names; '*' matches any run of characters."
        }
        _ => return,
    };
    eprintln!("\n{hint}");
}

/// Sets up the tracing subscriber for logging.
pub fn setup_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
