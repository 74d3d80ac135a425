// Raw OS counter sources: the sysinfo library, or /proc text files.
// One source is picked at startup and injected into the Sampler.

mod library;
mod proc_text;

use std::sync::Arc;
use std::time::Duration;

pub use library::LibraryCounterSource;
pub use proc_text::{
    ProcTextCounterSource, cpu_percent_between, memory_available_percent, parse_cpu_ticks,
    parse_diskstats, parse_meminfo, parse_net_dev,
};

use crate::config::{SamplerConfig, SourcePreference};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// sysinfo; CPU percent is computed by the library.
    Library,
    /// Kernel text interfaces under /proc; CPU percent is a two-snapshot tick delta.
    ProcText,
}

impl SourceKind {
    /// Library when sysinfo supports this OS, /proc text otherwise.
    pub fn detect() -> Self {
        if sysinfo::IS_SUPPORTED_SYSTEM {
            SourceKind::Library
        } else {
            SourceKind::ProcText
        }
    }

    pub fn resolve(preference: SourcePreference) -> Self {
        match preference {
            SourcePreference::Auto => Self::detect(),
            SourcePreference::Library => SourceKind::Library,
            SourcePreference::Proc => SourceKind::ProcText,
        }
    }
}

/// Each method degrades to the metric's zero baseline when its counters cannot be read.
pub trait CounterSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Average utilization over the source's sampling window. Blocks for that window.
    fn cpu_usage_percent(&self) -> f64;

    /// Percent of total memory still available.
    fn memory_available_percent(&self) -> f64;

    /// Cumulative completed (reads, writes) over whole devices.
    fn disk_io(&self) -> (u64, u64);

    /// Cumulative (received bytes, sent bytes).
    fn network_io(&self) -> (u64, u64);
}

/// Builds the process-wide counter source from config.
pub fn select(config: &SamplerConfig) -> Arc<dyn CounterSource> {
    let cpu_window = Duration::from_millis(config.cpu_window_ms);
    let kind = SourceKind::resolve(config.source);
    tracing::debug!(?kind, preference = ?config.source, "counter source selected");
    match kind {
        SourceKind::Library => {
            Arc::new(LibraryCounterSource::new(cpu_window, &config.proc_root))
        }
        SourceKind::ProcText => Arc::new(ProcTextCounterSource::new(&config.proc_root, cpu_window)),
    }
}

/// Round to 2 decimal places.
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_preference_overrides_detection() {
        assert_eq!(
            SourceKind::resolve(SourcePreference::Proc),
            SourceKind::ProcText
        );
        assert_eq!(
            SourceKind::resolve(SourcePreference::Library),
            SourceKind::Library
        );
        assert_eq!(SourceKind::resolve(SourcePreference::Auto), SourceKind::detect());
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(33.33333), 33.33);
        assert_eq!(round2(66.666), 66.67);
        assert_eq!(round2(0.0), 0.0);
    }
}
