//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// `fleetmon` command-line interface for fleet metrics collection
#[derive(Parser)]
#[command(name = "fleetmon")]
#[command(author, version, about = "Fleet metrics collector")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.json")]
    pub config: PathBuf,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Validate the configuration and print a summary
    #[command(about = "Validate the configuration file")]
    Check,

    /// Poll every configured server once and print the results
    #[command(about = "Run one full fleet poll")]
    Poll {
        /// Output format for the poll results
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Run the collector on the configured interval, printing each snapshot
    #[command(about = "Run the collector until interrupted")]
    Watch {
        /// Stop after this many snapshots (default: run until Ctrl-C)
        #[arg(short = 'n', long)]
        cycles: Option<u64>,
    },
}

/// Output format for poll results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table with status markers
    Table,
    /// Pretty-printed JSON
    Json,
}
