// Turns raw counters into one MetricsRecord per pass.

use std::sync::Arc;

use tracing::instrument;

use crate::config::SamplerConfig;
use crate::counter_source::{self, CounterSource, SourceKind};
use crate::models::MetricsRecord;

#[derive(Clone)]
pub struct Sampler {
    source: Arc<dyn CounterSource>,
}

impl Sampler {
    pub fn new(source: Arc<dyn CounterSource>) -> Self {
        Self { source }
    }

    pub fn from_config(config: &SamplerConfig) -> Self {
        Self::new(counter_source::select(config))
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// Blocks for the source's CPU window. Unreadable metrics are reported as zero.
    #[instrument(skip(self), fields(operation = "sample"))]
    pub fn sample(&self) -> MetricsRecord {
        let cpu_usage_percent = self.source.cpu_usage_percent();
        let memory_usage_percent = self.source.memory_available_percent();
        let (disk_usage_read, disk_usage_write) = self.source.disk_io();
        let (network_usage_received, network_usage_sent) = self.source.network_io();

        let record = MetricsRecord {
            cpu_usage_percent,
            memory_usage_percent,
            disk_usage_read,
            disk_usage_write,
            network_usage_received,
            network_usage_sent,
            source_capability_flag: self.source.kind() == SourceKind::Library,
        };
        tracing::debug!(?record, "sample taken");
        record
    }

    /// Runs `sample` on the blocking pool so the CPU window never stalls an async worker.
    pub async fn sample_async(&self) -> anyhow::Result<MetricsRecord> {
        let sampler = self.clone();
        tokio::task::spawn_blocking(move || sampler.sample())
            .await
            .map_err(|e| anyhow::anyhow!("sampler task join: {}", e))
    }
}
