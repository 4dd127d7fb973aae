//! `fleetmon` Core Library
//!
//! This crate provides the collection engine for the `fleetmon` server
//! monitor: it connects to a fleet of servers over SSH, runs a fixed
//! battery of diagnostic commands on each, parses the heterogeneous
//! textual output into normalized metric records, and exposes the latest
//! fleet snapshot to consumers while a background scheduler refreshes it.
//!
//! # Crate Structure
//!
//! - [`config`] - Configuration loading and fail-fast validation
//! - [`session`] - Remote command-execution contract and the OpenSSH
//!   subprocess transport
//! - [`monitoring`] - Metric extractors, per-server poller, and the
//!   scheduling collector with its snapshot store
//!
//! Presentation (HTTP, rendering) is deliberately not part of this crate;
//! consumers read snapshots through [`monitoring::MetricsCollector`] only.

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod config;
pub mod monitoring;
pub mod session;

pub use config::{ConfigError, ConfigResult, MonitorConfig, ServerConfig};
pub use monitoring::{
    DiskIo, FleetSnapshot, LoadAverage, MemoryStats, MetricsCollector, NetworkIo, PollStatus,
    ServerPoller, ServerSnapshot,
};
pub use session::{ConnectError, Connector, ExecOutput, RemoteSession, RunError, SshConnector};
