//! Configuration layer for basewatch.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments or their environment variables**
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! The station allow-list from `--stations` **replaces** the TOML list
//! entirely (not merged).
//!
//! # Boolean Flag Semantics
//!
//! `--allow-insecure-http` uses OR semantics with the TOML value. TLS
//! verification is on unless `--no-tls-verify` or `tls_verify = false`
//! turns it off; the CLI cannot turn it back on.
//!
//! # TOML-Only Options
//!
//! - `alerts.prune_deleted_channels` (default: true)

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod validated_tests;

pub use cli::{Cli, Command};
pub use error::{ConfigError, field};
pub use toml::{TomlConfig, default_config_template};
pub use validated::{
    ValidatedConfig, expand_tilde, load_toml, subscriptions_path, write_default_config,
};
