//! Data models for fleet metrics
//!
//! All types are transport-free and serializable; the presentation layer
//! renders its own placeholders for absent values, so every metric field
//! on [`ServerSnapshot`] is optional and `None` means "unknown", never
//! zero.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;

/// Latest snapshot for the whole fleet, keyed by [`ServerConfig::key`]
pub type FleetSnapshot = HashMap<String, ServerSnapshot>;

/// Whether a server poll produced metrics or failed outright
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    /// The session was established; individual metrics may still be unknown
    Success,
    /// The server could not be polled at all (connection failure)
    Error,
}

/// Memory usage in megabytes, from the `free -m` table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Total physical memory (MB)
    pub total_mb: u64,
    /// Used memory (MB)
    pub used_mb: u64,
    /// Free memory (MB)
    pub free_mb: u64,
    /// Available memory (MB); defaults to `used_mb` when the column is absent
    pub available_mb: u64,
    /// `used / total * 100`, zero when total is zero
    pub usage_percent: f64,
}

/// Load average over the standard one/five/fifteen minute windows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    /// 1-minute load average
    #[serde(rename = "1min")]
    pub one_min: f64,
    /// 5-minute load average
    #[serde(rename = "5min")]
    pub five_min: f64,
    /// 15-minute load average
    #[serde(rename = "15min")]
    pub fifteen_min: f64,
}

/// Disk I/O for the first recognized block device.
///
/// `Unavailable` means the host offered no usable source (no `iostat`, no
/// matching device in `/proc/diskstats`); it is distinct from the metric
/// being unknown, which is an absent field on the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DiskIo {
    /// Measured read/write volume in megabytes
    Available {
        /// Megabytes read
        read_mb: f64,
        /// Megabytes written
        write_mb: f64,
    },
    /// No disk statistics source exists on this host
    Unavailable,
}

/// Network I/O for the first recognized interface, in megabytes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkIo {
    /// Megabytes received
    pub rx_mb: f64,
    /// Megabytes transmitted
    pub tx_mb: f64,
}

/// Complete, immutable metrics record for one server at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSnapshot {
    /// Server display name (from configuration)
    pub name: String,
    /// Server host (from configuration)
    pub host: String,
    /// When this poll completed
    pub timestamp: DateTime<Utc>,
    /// Outcome of the poll
    pub status: PollStatus,
    /// Human-readable cause, present exactly when `status` is `Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// CPU usage percentage, when any extraction path succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage_percent: Option<f64>,
    /// Memory statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryStats>,
    /// Load average
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_average: Option<LoadAverage>,
    /// Disk I/O (or an explicit unavailable marker)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_io: Option<DiskIo>,
    /// Network I/O
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_io: Option<NetworkIo>,
}

impl ServerSnapshot {
    /// Snapshot for a server that could not be reached.
    ///
    /// All metric fields stay empty; `error` carries the cause.
    #[must_use]
    pub fn connect_failure(server: &ServerConfig, error: impl Into<String>) -> Self {
        Self {
            name: server.name.clone(),
            host: server.host.clone(),
            timestamp: Utc::now(),
            status: PollStatus::Error,
            error: Some(error.into()),
            cpu_usage_percent: None,
            memory: None,
            load_average: None,
            disk_io: None,
            network_io: None,
        }
    }
}
