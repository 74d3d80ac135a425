// One sampler pass: two percentages and two cumulative counter pairs.

use serde::{Deserialize, Serialize};

/// Output of a single sampling pass, emitted as one JSON line.
///
/// `memory_usage_percent` is the share of memory still *available*, not used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    #[serde(rename = "cpu_usage")]
    pub cpu_usage_percent: f64,
    #[serde(rename = "memory_usage")]
    pub memory_usage_percent: f64,
    pub disk_usage_read: u64,
    pub disk_usage_write: u64,
    pub network_usage_received: u64,
    pub network_usage_sent: u64,
    /// True when the counters came from the system-metrics library rather than /proc text files.
    #[serde(rename = "psutil_available")]
    pub source_capability_flag: bool,
}

impl MetricsRecord {
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
