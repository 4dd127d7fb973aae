//! Fleet metrics collection
//!
//! Agentless monitoring of remote Linux hosts: pure extractors parse the
//! output of a fixed command battery, the poller drives that battery over
//! one session per server, and the collector schedules full-fleet refresh
//! cycles and stores the latest snapshot for consumers.
//!
//! This module is presentation-free — it produces data models only; the
//! serving layer formats and renders them.

pub mod collector;
pub mod extract;
mod metrics;
mod poller;
#[cfg(test)]
pub mod testutil;

pub use collector::MetricsCollector;
pub use metrics::{
    DiskIo, FleetSnapshot, LoadAverage, MemoryStats, NetworkIo, PollStatus, ServerSnapshot,
};
pub use poller::ServerPoller;
