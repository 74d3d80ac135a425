// Raw OS counter readings. Never persisted.

/// Aggregate CPU tick counters: the idle column and the sum of all columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTicks {
    pub idle: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryCounters {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

