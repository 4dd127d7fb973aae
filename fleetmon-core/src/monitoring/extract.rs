//! Pure metric extractors and their remote command strings
//!
//! Each extractor turns raw command output into a typed value or `None`.
//! Output-format variance across distributions and tool versions is
//! expected and normal, so an unparseable input is "unknown", never an
//! error — the poller decides which fallback command to try next.
//!
//! Keeping every function `&str -> Option<T>` makes the whole battery
//! unit-testable against captured output without a live session.

use std::sync::LazyLock;

use regex::Regex;

use super::metrics::{DiskIo, LoadAverage, MemoryStats, NetworkIo};

/// Primary CPU source: the `top` summary line
pub const CPU_TOP_COMMAND: &str = "top -bn1 | grep 'Cpu(s)' | head -1";

/// Fallback CPU source: usage computed remotely from `/proc/stat` counters
pub const CPU_COUNTERS_COMMAND: &str =
    "grep '^cpu ' /proc/stat | awk '{usage=($2+$4)*100/($2+$3+$4+$5)} END {print usage}'";

/// Memory source: the human-readable megabyte table
pub const MEMORY_COMMAND: &str = "free -m";

/// Primary load source: the `uptime` one-liner
pub const LOAD_UPTIME_COMMAND: &str = "uptime";

/// Fallback load source: the loadavg pseudo-file
pub const LOAD_PROC_COMMAND: &str = "cat /proc/loadavg";

/// Primary disk source: extended I/O statistics (absent on minimal hosts)
pub const DISK_IOSTAT_COMMAND: &str = "iostat -x 1 1 2>/dev/null | tail -n +4";

/// Fallback disk source: cumulative sector counters converted to MB remotely
pub const DISK_SECTORS_COMMAND: &str = "cat /proc/diskstats | \
     grep -E 'sd[a-z]|nvme|vd[a-z]' | head -1 | \
     awk '{read=$6*512/1024/1024; write=$10*512/1024/1024; print read\" \"write}'";

/// Network source: cumulative byte counters converted to MB remotely
pub const NETWORK_COMMAND: &str = "cat /proc/net/dev | \
     grep -E 'eth0|ens|enp|wlan' | head -1 | \
     awk '{rx=$2/1024/1024; tx=$10/1024/1024; print rx\" \"tx}'";

/// Legacy top format: `Cpu(s): 12.5%us, ...`
static CPU_LEGACY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+\.?[0-9]*)%us").expect("CPU_LEGACY_RE is a valid regex pattern")
});

/// Modern top format: `%Cpu(s): 12.5 us, ...`
static CPU_MODERN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%Cpu\(s\):\s*([0-9]+\.?[0-9]*)\s*us")
        .expect("CPU_MODERN_RE is a valid regex pattern")
});

/// `load average: 0.52, 0.58, 0.59` from an uptime-style summary
static LOAD_AVERAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"load average:\s*([0-9.]+),\s*([0-9.]+),\s*([0-9.]+)")
        .expect("LOAD_AVERAGE_RE is a valid regex pattern")
});

/// Extracts the user-time percentage from a `top` summary line.
///
/// Handles both the legacy (`12.5%us`) and modern (`%Cpu(s): 12.5 us`)
/// formats. Values outside 0–100 are treated as unparseable.
#[must_use]
pub fn cpu_from_top(output: &str) -> Option<f64> {
    let captures = CPU_LEGACY_RE
        .captures(output)
        .or_else(|| CPU_MODERN_RE.captures(output))?;
    parse_percent(captures.get(1)?.as_str())
}

/// Parses the bare float produced by the remote `/proc/stat` formula
#[must_use]
pub fn cpu_from_counters(output: &str) -> Option<f64> {
    parse_percent(output.trim())
}

fn parse_percent(s: &str) -> Option<f64> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && (0.0..=100.0).contains(v))
}

/// Parses the `Mem:` row of a `free -m` table.
///
/// Requires at least total/used/free columns; the `available` column
/// defaults to `used` when absent (older `free` versions). Usage percent
/// guards a zero total.
#[must_use]
pub fn memory_from_free(output: &str) -> Option<MemoryStats> {
    let line = output
        .lines()
        .find(|l| l.trim_start().starts_with("Mem:"))?;
    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|t| t.parse().ok())
        .collect();
    if values.len() < 3 {
        return None;
    }

    let total_mb = values[0];
    let used_mb = values[1];
    let free_mb = values[2];
    let available_mb = values.get(5).copied().unwrap_or(used_mb);
    let usage_percent = if total_mb > 0 {
        used_mb as f64 / total_mb as f64 * 100.0
    } else {
        0.0
    };

    Some(MemoryStats {
        total_mb,
        used_mb,
        free_mb,
        available_mb,
        usage_percent,
    })
}

/// Extracts the load average triple from an `uptime` summary line
#[must_use]
pub fn load_from_uptime(output: &str) -> Option<LoadAverage> {
    let captures = LOAD_AVERAGE_RE.captures(output)?;
    Some(LoadAverage {
        one_min: captures.get(1)?.as_str().parse().ok()?,
        five_min: captures.get(2)?.as_str().parse().ok()?,
        fifteen_min: captures.get(3)?.as_str().parse().ok()?,
    })
}

/// Reads the three leading numbers of the loadavg pseudo-file
#[must_use]
pub fn load_from_loadavg(output: &str) -> Option<LoadAverage> {
    let mut fields = output.split_whitespace();
    Some(LoadAverage {
        one_min: fields.next()?.parse().ok()?,
        five_min: fields.next()?.parse().ok()?,
        fifteen_min: fields.next()?.parse().ok()?,
    })
}

/// Device names we accept as "the" disk for I/O reporting
fn is_block_device(name: &str) -> bool {
    name.starts_with("sd") || name.starts_with("nvme") || name.starts_with("vd")
}

/// Parses extended I/O statistics output into per-second disk throughput.
///
/// Column order differs across sysstat versions, so the `rkB/s` and
/// `wkB/s` positions are looked up from the header row (first token
/// `Device` or `Device:`), then read from the first `sd*`/`nvme*`/`vd*`
/// device row. Values are converted from kB to MB.
#[must_use]
pub fn disk_from_iostat(output: &str) -> Option<DiskIo> {
    let mut lines = output.lines();
    let header = lines.find(|l| {
        l.split_whitespace()
            .next()
            .is_some_and(|t| t.trim_end_matches(':') == "Device")
    })?;

    let columns: Vec<&str> = header.split_whitespace().collect();
    let read_idx = columns.iter().position(|c| *c == "rkB/s")?;
    let write_idx = columns.iter().position(|c| *c == "wkB/s")?;

    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(device) = fields.first() else {
            continue;
        };
        if !is_block_device(device) {
            continue;
        }
        let read_kb: f64 = fields.get(read_idx)?.parse().ok()?;
        let write_kb: f64 = fields.get(write_idx)?.parse().ok()?;
        return Some(DiskIo::Available {
            read_mb: read_kb / 1024.0,
            write_mb: write_kb / 1024.0,
        });
    }
    None
}

/// Parses the two megabyte values the remote diskstats formula prints
#[must_use]
pub fn disk_from_sectors(output: &str) -> Option<DiskIo> {
    let (read_mb, write_mb) = two_floats(output)?;
    Some(DiskIo::Available { read_mb, write_mb })
}

/// Parses the two megabyte values the remote net-dev formula prints
#[must_use]
pub fn network_from_counters(output: &str) -> Option<NetworkIo> {
    let (rx_mb, tx_mb) = two_floats(output)?;
    Some(NetworkIo { rx_mb, tx_mb })
}

/// Two non-negative whitespace-separated floats, or nothing
fn two_floats(s: &str) -> Option<(f64, f64)> {
    let mut fields = s.split_whitespace();
    let a: f64 = fields.next()?.parse().ok()?;
    let b: f64 = fields.next()?.parse().ok()?;
    if a.is_finite() && b.is_finite() && a >= 0.0 && b >= 0.0 {
        Some((a, b))
    } else {
        None
    }
}
