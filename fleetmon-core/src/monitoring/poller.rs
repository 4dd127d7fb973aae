//! Per-server poll battery
//!
//! [`ServerPoller`] turns one [`ServerConfig`] into exactly one
//! [`ServerSnapshot`]. Connection failure is the only whole-server
//! failure: once a session exists, each metric runs its command
//! sequence independently and any command or parse failure collapses
//! to `None` for that metric alone. The containment is type-level —
//! extractors return `Option` and session errors are consumed here, so
//! no failure path can abort the remaining battery.

use std::sync::Arc;

use chrono::Utc;

use super::extract;
use super::metrics::{DiskIo, FleetSnapshot, PollStatus, ServerSnapshot};
use crate::config::ServerConfig;
use crate::session::{Connector, RemoteSession};

/// Polls servers sequentially through a [`Connector`]
#[derive(Clone)]
pub struct ServerPoller {
    connector: Arc<dyn Connector>,
}

impl ServerPoller {
    /// Creates a poller over the given transport
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Produces one snapshot for one server.
    ///
    /// The session is closed on every exit path; close-time errors are
    /// swallowed by the session itself.
    pub async fn poll_server(&self, server: &ServerConfig) -> ServerSnapshot {
        let mut session = match self.connector.connect(server).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(
                    name = %server.name,
                    host = %server.host,
                    error = %e,
                    "Server poll failed to connect"
                );
                return ServerSnapshot::connect_failure(server, e.to_string());
            }
        };

        // Fixed battery order; a metric failing must not disturb the rest
        let cpu_usage_percent = gather_cpu(session.as_mut()).await;
        let memory = run_text(session.as_mut(), extract::MEMORY_COMMAND)
            .await
            .as_deref()
            .and_then(extract::memory_from_free);
        let load_average = gather_load(session.as_mut()).await;
        let disk_io = Some(gather_disk(session.as_mut()).await);
        let network_io = run_text(session.as_mut(), extract::NETWORK_COMMAND)
            .await
            .as_deref()
            .and_then(extract::network_from_counters);

        session.close().await;

        ServerSnapshot {
            name: server.name.clone(),
            host: server.host.clone(),
            timestamp: Utc::now(),
            status: PollStatus::Success,
            error: None,
            cpu_usage_percent,
            memory,
            load_average,
            disk_io,
            network_io,
        }
    }

    /// Polls every server in order and assembles the fleet map.
    ///
    /// One slow or failing server delays the cycle but never removes the
    /// others from the result; the map always covers exactly `servers`.
    pub async fn poll_fleet(&self, servers: &[ServerConfig]) -> FleetSnapshot {
        let mut fleet = FleetSnapshot::with_capacity(servers.len());
        for server in servers {
            let snapshot = self.poll_server(server).await;
            fleet.insert(server.key(), snapshot);
        }
        fleet
    }
}

/// Runs one command, yielding trimmed stdout only for a clean, non-empty result
async fn run_text(session: &mut dyn RemoteSession, command: &str) -> Option<String> {
    match session.run(command).await {
        Ok(output) if output.success() && !output.stdout.is_empty() => Some(output.stdout),
        Ok(output) => {
            tracing::debug!(
                command,
                exit_code = output.exit_code,
                "Metric command exited unclean"
            );
            None
        }
        Err(e) => {
            tracing::debug!(command, error = %e, "Metric command failed to run");
            None
        }
    }
}

/// CPU: `top` summary line first, `/proc/stat` formula as fallback
async fn gather_cpu(session: &mut dyn RemoteSession) -> Option<f64> {
    if let Some(cpu) = run_text(session, extract::CPU_TOP_COMMAND)
        .await
        .as_deref()
        .and_then(extract::cpu_from_top)
    {
        return Some(cpu);
    }
    run_text(session, extract::CPU_COUNTERS_COMMAND)
        .await
        .as_deref()
        .and_then(extract::cpu_from_counters)
}

/// Load average: `uptime` pattern first, loadavg pseudo-file as fallback
async fn gather_load(
    session: &mut dyn RemoteSession,
) -> Option<super::metrics::LoadAverage> {
    if let Some(load) = run_text(session, extract::LOAD_UPTIME_COMMAND)
        .await
        .as_deref()
        .and_then(extract::load_from_uptime)
    {
        return Some(load);
    }
    run_text(session, extract::LOAD_PROC_COMMAND)
        .await
        .as_deref()
        .and_then(extract::load_from_loadavg)
}

/// Disk I/O: extended statistics first, sector counters second, and an
/// explicit unavailable marker when neither source exists on the host
async fn gather_disk(session: &mut dyn RemoteSession) -> DiskIo {
    if let Some(disk) = run_text(session, extract::DISK_IOSTAT_COMMAND)
        .await
        .as_deref()
        .and_then(extract::disk_from_iostat)
    {
        return disk;
    }
    run_text(session, extract::DISK_SECTORS_COMMAND)
        .await
        .as_deref()
        .and_then(extract::disk_from_sectors)
        .unwrap_or(DiskIo::Unavailable)
}
