//! Tests for validated configuration.

use super::ConfigError;
use super::cli::Cli;
use super::toml::TomlConfig;
use super::validated::ValidatedConfig;

/// Helper to create CLI args from a slice
fn cli(args: &[&str]) -> Cli {
    let mut full_args = vec!["basewatch"];
    full_args.extend(args);
    Cli::parse_from_iter(full_args)
}

/// CLI with an endpoint and token so only the field under test varies
fn base_cli(extra: &[&str]) -> Cli {
    let mut args = vec!["--endpoint", "https://status.example.com/api", "--token", "t"];
    args.extend(extra);
    cli(&args)
}

/// Helper to parse TOML config
fn toml(content: &str) -> TomlConfig {
    TomlConfig::parse(content).unwrap()
}

mod validation_tests;
