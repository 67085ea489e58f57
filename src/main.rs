//! basewatch: game base health and goods alerts for Discord
//!
//! Entry point for the basewatch application.

use basewatch::config::{
    Cli, Command, ValidatedConfig, load_toml, subscriptions_path, write_default_config,
};
use basewatch::subscription::FileSubscriptionStore;
use std::process::ExitCode;

mod app;
mod run;

use app::{exit_code, print_config_hint, setup_tracing};

/// Main entry point.
///
/// Excluded from coverage as it's the thin wrapper around testable components.
#[cfg(not(tarpaulin_include))]
fn main() -> ExitCode {
    let mut cli = Cli::parse_args();

    match &cli.command {
        Some(Command::Init { output }) => return handle_init(output),
        Some(
            command @ (Command::Subscribe { .. } | Command::Unsubscribe { .. } | Command::List),
        ) => return handle_registry(&cli, command),
        // One cycle from an empty snapshot never alerts, so no token is needed.
        Some(Command::Check) => cli.dry_run = true,
        None => {}
    }

    // Load and validate configuration
    let config = match ValidatedConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            print_config_hint(&e);
            return exit_code::CONFIG_ERROR;
        }
    };

    // Setup logging and run
    setup_tracing(config.verbose);
    tracing::info!("{config}");

    if cli.command == Some(Command::Check) {
        return run_check(&config);
    }
    run_application(config)
}

/// Handles the `init` subcommand.
fn handle_init(output: &std::path::Path) -> ExitCode {
    match write_default_config(output) {
        Ok(()) => {
            println!("Configuration template written to: {}", output.display());
            exit_code::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code::CONFIG_ERROR
        }
    }
}

/// Handles `subscribe`, `unsubscribe` and `list`.
///
/// Only the registry path is resolved; endpoint and token are not required.
#[cfg(not(tarpaulin_include))]
fn handle_registry(cli: &Cli, command: &Command) -> ExitCode {
    let toml = match load_toml(cli) {
        Ok(toml) => toml,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            print_config_hint(&e);
            return exit_code::CONFIG_ERROR;
        }
    };

    setup_tracing(cli.verbose);
    let store = FileSubscriptionStore::new(subscriptions_path(cli, toml.as_ref()));

    let Some(runtime) = create_runtime() else {
        return exit_code::runtime_error();
    };

    match runtime.block_on(run::registry_command(&store, command)) {
        Ok(output) => {
            println!("{output}");
            exit_code::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code::runtime_error()
        }
    }
}

/// Handles the `check` subcommand.
///
/// Excluded from coverage - requires network access.
#[cfg(not(tarpaulin_include))]
fn run_check(config: &ValidatedConfig) -> ExitCode {
    let Some(runtime) = create_runtime() else {
        return exit_code::runtime_error();
    };

    match runtime.block_on(run::check(config)) {
        Ok((outcome, status)) => {
            print!("{status}");
            println!("Events: {}", outcome.events);
            exit_code::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code::runtime_error()
        }
    }
}

/// Runs the main application with the given configuration.
///
/// Excluded from coverage - requires async runtime.
#[cfg(not(tarpaulin_include))]
fn run_application(config: ValidatedConfig) -> ExitCode {
    let Some(runtime) = create_runtime() else {
        return exit_code::runtime_error();
    };

    match runtime.block_on(run::execute(config)) {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => {
            tracing::error!("Application error: {e}");
            exit_code::runtime_error()
        }
    }
}

fn create_runtime() -> Option<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .inspect_err(|e| eprintln!("Failed to create Tokio runtime: {e}"))
        .ok()
}
