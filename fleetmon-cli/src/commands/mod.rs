//! Command handler modules for the CLI.

mod check;
mod poll;
mod watch;

use std::path::Path;

use fleetmon_core::config::MonitorConfig;

use crate::cli::Commands;
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(config_path: &Path, command: Commands, quiet: bool) -> Result<(), CliError> {
    match command {
        Commands::Check => check::cmd_check(config_path, quiet),
        Commands::Poll { format } => poll::cmd_poll(config_path, format),
        Commands::Watch { cycles } => watch::cmd_watch(config_path, cycles, quiet),
    }
}

/// Loads and validates the configuration, mapping failures to [`CliError`]
pub(crate) fn load_config(config_path: &Path) -> Result<MonitorConfig, CliError> {
    MonitorConfig::load(config_path).map_err(|e| CliError::Config(e.to_string()))
}

/// Builds the async runtime command handlers block on
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Runtime(format!("Failed to create async runtime: {e}")))
}
