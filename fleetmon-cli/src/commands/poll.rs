//! One-shot fleet poll command.

use std::path::Path;
use std::sync::Arc;

use fleetmon_core::monitoring::{DiskIo, FleetSnapshot, PollStatus, ServerPoller, ServerSnapshot};
use fleetmon_core::session::SshConnector;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Poll command handler: runs one full synchronous fleet poll and prints
/// the results. Exits with a poll failure only when every server failed.
pub fn cmd_poll(config_path: &Path, format: OutputFormat) -> Result<(), CliError> {
    let config = super::load_config(config_path)?;
    let runtime = super::runtime()?;

    let connector = Arc::new(SshConnector::new(config.key_path()));
    let poller = ServerPoller::new(connector);
    let fleet = runtime.block_on(poller.poll_fleet(&config.servers));

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&fleet)
                .map_err(|e| CliError::Runtime(format!("Failed to serialize snapshot: {e}")))?;
            println!("{json}");
        }
        OutputFormat::Table => print_fleet(&fleet),
    }

    let failed = fleet
        .values()
        .filter(|s| s.status == PollStatus::Error)
        .count();
    tracing::info!(servers = fleet.len(), failed, "Fleet poll complete");
    if !fleet.is_empty() && failed == fleet.len() {
        return Err(CliError::PollFailed(format!(
            "all {failed} servers failed to poll"
        )));
    }
    Ok(())
}

/// Prints one line per server with a colored status marker
fn print_fleet(fleet: &FleetSnapshot) {
    let mut keys: Vec<&String> = fleet.keys().collect();
    keys.sort();
    for key in keys {
        print_server(&fleet[key]);
    }
}

fn print_server(snapshot: &ServerSnapshot) {
    const GREEN: &str = "\x1b[32m";
    const RED: &str = "\x1b[31m";
    const RESET: &str = "\x1b[0m";
    const BOLD: &str = "\x1b[1m";

    match snapshot.status {
        PollStatus::Success => {
            println!(
                "{GREEN}{BOLD}\u{2713}{RESET} {} ({})  cpu {}  mem {}  load {}  disk {}  net {}",
                snapshot.name,
                snapshot.host,
                snapshot
                    .cpu_usage_percent
                    .map_or_else(|| "N/A".to_string(), |v| format!("{v:.1}%")),
                snapshot.memory.map_or_else(
                    || "N/A".to_string(),
                    |m| format!("{:.1}% ({}MB/{}MB)", m.usage_percent, m.used_mb, m.total_mb)
                ),
                snapshot.load_average.map_or_else(
                    || "N/A".to_string(),
                    |l| format!("{:.2} {:.2} {:.2}", l.one_min, l.five_min, l.fifteen_min)
                ),
                snapshot.disk_io.map_or_else(
                    || "N/A".to_string(),
                    |d| match d {
                        DiskIo::Available { read_mb, write_mb } =>
                            format!("r {read_mb:.1}MB w {write_mb:.1}MB"),
                        DiskIo::Unavailable => "unavailable".to_string(),
                    }
                ),
                snapshot.network_io.map_or_else(
                    || "N/A".to_string(),
                    |n| format!("rx {:.1}MB tx {:.1}MB", n.rx_mb, n.tx_mb)
                ),
            );
        }
        PollStatus::Error => {
            println!(
                "{RED}{BOLD}\u{2717}{RESET} {} ({})  {}",
                snapshot.name,
                snapshot.host,
                snapshot.error.as_deref().unwrap_or("unknown error"),
            );
        }
    }
}
