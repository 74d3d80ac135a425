// Fallback counter source: Linux kernel text interfaces (/proc/stat, meminfo, diskstats, net/dev).
// Each metric fails independently; a missing or malformed file zeroes only that metric.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::instrument;

use super::{CounterSource, SourceKind, round2};
use crate::models::{CpuTicks, MemoryCounters};

/// Minimum fields on a /proc/diskstats line (major, minor, name + 11 counters).
const DISKSTATS_MIN_FIELDS: usize = 14;
/// Interface name + 8 receive + 8 transmit columns.
const NET_DEV_MIN_FIELDS: usize = 17;

pub struct ProcTextCounterSource {
    root: PathBuf,
    cpu_window: Duration,
}

impl ProcTextCounterSource {
    /// `root` is normally `/proc`.
    pub fn new(root: impl AsRef<Path>, cpu_window: Duration) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            cpu_window,
        }
    }

    fn read(&self, name: &str) -> Option<String> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "counter file unavailable");
                None
            }
        }
    }

    pub fn read_cpu_ticks(&self) -> Option<CpuTicks> {
        let ticks = parse_cpu_ticks(&self.read("stat")?);
        if ticks.is_none() {
            tracing::warn!("malformed cpu line in stat");
        }
        ticks
    }

    pub fn read_memory(&self) -> Option<MemoryCounters> {
        let mem = parse_meminfo(&self.read("meminfo")?);
        if mem.is_none() {
            tracing::warn!("malformed meminfo");
        }
        mem
    }
}

impl CounterSource for ProcTextCounterSource {
    fn kind(&self) -> SourceKind {
        SourceKind::ProcText
    }

    #[instrument(skip(self), fields(source = "proc", operation = "cpu_usage_percent"))]
    fn cpu_usage_percent(&self) -> f64 {
        let Some(before) = self.read_cpu_ticks() else {
            return 0.0;
        };
        std::thread::sleep(self.cpu_window);
        let Some(after) = self.read_cpu_ticks() else {
            return 0.0;
        };
        cpu_percent_between(before, after)
    }

    fn memory_available_percent(&self) -> f64 {
        self.read_memory()
            .map(memory_available_percent)
            .unwrap_or(0.0)
    }

    fn disk_io(&self) -> (u64, u64) {
        let Some(content) = self.read("diskstats") else {
            return (0, 0);
        };
        parse_diskstats(&content).unwrap_or_else(|| {
            tracing::warn!("malformed diskstats, reporting zero disk io");
            (0, 0)
        })
    }

    fn network_io(&self) -> (u64, u64) {
        let Some(content) = self.read("net/dev") else {
            return (0, 0);
        };
        parse_net_dev(&content).unwrap_or_else(|| {
            tracing::warn!("malformed net/dev, reporting zero network io");
            (0, 0)
        })
    }
}

/// First line of /proc/stat: `cpu  user nice system idle iowait irq softirq steal guest guest_nice`.
/// Only the idle column and the sum of all columns are kept.
pub fn parse_cpu_ticks(content: &str) -> Option<CpuTicks> {
    let line = content.lines().next()?;
    let mut fields = line.split_whitespace();
    if !fields.next()?.starts_with("cpu") {
        return None;
    }
    let values = fields
        .map(|f| f.parse::<u64>().ok())
        .collect::<Option<Vec<u64>>>()?;
    let idle = *values.get(3)?;
    let total = values.iter().try_fold(0u64, |acc, v| acc.checked_add(*v))?;
    Some(CpuTicks { idle, total })
}

/// Busy share of the ticks elapsed between two snapshots, rounded to 2 decimals.
/// No elapsed ticks yields 0.0.
pub fn cpu_percent_between(before: CpuTicks, after: CpuTicks) -> f64 {
    let idle_delta = after.idle.saturating_sub(before.idle);
    let total_delta = after.total.saturating_sub(before.total);
    if total_delta == 0 {
        return 0.0;
    }
    let usage = 100.0 * (1.0 - idle_delta as f64 / total_delta as f64);
    round2(usage.clamp(0.0, 100.0))
}

/// `Key:   value kB` lines, converted to bytes. `MemTotal` is required. Available memory is
/// `MemAvailable` when present and non-zero, else `MemFree + Buffers + Cached`.
pub fn parse_meminfo(content: &str) -> Option<MemoryCounters> {
    let mut values: HashMap<&str, u64> = HashMap::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let (key, rest) = line.split_once(':')?;
        if rest.contains(':') {
            return None;
        }
        let kib: u64 = rest.split_whitespace().next()?.parse().ok()?;
        values.insert(key.trim(), kib.saturating_mul(1024));
    }

    let total_bytes = *values.get("MemTotal")?;
    let get = |key: &str| values.get(key).copied().unwrap_or(0);
    let available_bytes = match get("MemAvailable") {
        0 => get("MemFree")
            .saturating_add(get("Buffers"))
            .saturating_add(get("Cached")),
        available => available,
    };
    Some(MemoryCounters {
        total_bytes,
        available_bytes,
    })
}

/// Available memory as a percent of total, rounded to 2 decimals; 0.0 when total is 0.
pub fn memory_available_percent(mem: MemoryCounters) -> f64 {
    if mem.total_bytes == 0 {
        return 0.0;
    }
    round2(mem.available_bytes as f64 * 100.0 / mem.total_bytes as f64)
}

/// Sums reads and writes completed over whole devices. Names ending in a digit are
/// treated as partitions and skipped. Any malformed line discards the whole result.
pub fn parse_diskstats(content: &str) -> Option<(u64, u64)> {
    let mut reads = 0u64;
    let mut writes = 0u64;
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < DISKSTATS_MIN_FIELDS {
            return None;
        }
        let device = fields[2];
        if device.ends_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        reads = reads.saturating_add(fields[3].parse().ok()?);
        writes = writes.saturating_add(fields[7].parse().ok()?);
    }
    Some((reads, writes))
}

/// Sums received and transmitted bytes over every interface except `lo`.
/// The two header lines are skipped. Any malformed line discards the whole result.
pub fn parse_net_dev(content: &str) -> Option<(u64, u64)> {
    let mut received = 0u64;
    let mut sent = 0u64;
    for line in content.lines().skip(2).filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < NET_DEV_MIN_FIELDS {
            return None;
        }
        let interface = fields[0].trim_end_matches(':');
        if interface == "lo" {
            continue;
        }
        received = received.saturating_add(fields[1].parse().ok()?);
        sent = sent.saturating_add(fields[9].parse().ok()?);
    }
    Some((received, sent))
}
