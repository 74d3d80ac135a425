// Domain models

mod counters;
mod host;
mod record;

pub use counters::{CpuTicks, MemoryCounters};
pub use host::HostStats;
pub use record::MetricsRecord;

use std::collections::BTreeMap;

/// Query result: host name -> averages, ordered by host.
pub type HostStatsMap = BTreeMap<String, HostStats>;
