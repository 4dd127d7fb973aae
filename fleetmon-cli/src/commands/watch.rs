//! Continuous collection command.

use std::path::Path;

use tokio::time::sleep;

use fleetmon_core::monitoring::MetricsCollector;

use crate::error::CliError;

/// Watch command handler: starts the background collector and prints the
/// fleet snapshot after each refresh until interrupted (or after `cycles`
/// snapshots when given).
pub fn cmd_watch(config_path: &Path, cycles: Option<u64>, quiet: bool) -> Result<(), CliError> {
    let config = super::load_config(config_path)?;
    let runtime = super::runtime()?;

    runtime.block_on(async move {
        let collector = MetricsCollector::with_ssh_transport(config);
        let interval = collector.refresh_interval();

        collector.start().await;

        if !quiet {
            eprintln!(
                "Collecting every {}s, press Ctrl-C to stop",
                interval.as_secs()
            );
        }

        let mut printed: u64 = 0;
        loop {
            print_snapshot(&collector)?;
            printed += 1;
            if cycles.is_some_and(|limit| printed >= limit) {
                break;
            }

            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.map_err(|e| {
                        CliError::Runtime(format!("Failed to listen for Ctrl-C: {e}"))
                    })?;
                    if !quiet {
                        eprintln!("Interrupted, stopping collector");
                    }
                    break;
                }
                () = sleep(interval) => {}
            }
        }

        collector.stop().await;
        Ok(())
    })
}

fn print_snapshot(collector: &MetricsCollector) -> Result<(), CliError> {
    let snapshot = collector.snapshot();
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| CliError::Runtime(format!("Failed to serialize snapshot: {e}")))?;
    println!("{json}");
    Ok(())
}
