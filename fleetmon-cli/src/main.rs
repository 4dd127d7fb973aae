//! `fleetmon` CLI - operational surface for the fleet metrics collector
//!
//! Provides commands for validating the configuration, running a one-shot
//! fleet poll, and watching the fleet on the configured refresh interval.

mod cli;
mod commands;
mod error;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = commands::dispatch(&cli.config, cli.command, cli.quiet);

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}

/// Maps `-v` flags to a tracing filter; `RUST_LOG` wins when set
fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fleetmon={level},fleetmon_core={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
