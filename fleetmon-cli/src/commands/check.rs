//! Validate the configuration file command.

use std::path::Path;

use crate::error::CliError;

/// Check command handler: loads the configuration, failing with the
/// first violated constraint, and prints a summary.
pub fn cmd_check(config_path: &Path, quiet: bool) -> Result<(), CliError> {
    let config = super::load_config(config_path)?;

    if !quiet {
        println!("Configuration OK: {}", config_path.display());
        println!("  servers:          {}", config.servers.len());
        for server in &config.servers {
            println!("    {} ({}@{})", server.name, server.user, server.host);
        }
        println!("  ssh key:          {}", config.key_path().display());
        println!("  refresh interval: {}s", config.refresh_interval);
        println!("  port:             {}", config.port);
    }
    Ok(())
}
