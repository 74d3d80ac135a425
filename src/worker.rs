// Background sampling worker: takes one sample per interval off the request path and
// persists it. Only runs when the server is configured to collect for its own host.

use crate::metrics_repo::MetricsRepo;
use crate::sampler::Sampler;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::{Duration, interval};
use tracing::Instrument;

pub struct WorkerDeps {
    pub sampler: Sampler,
    pub store: Arc<MetricsRepo>,
    /// Host name the samples are stored under.
    pub host: String,
    pub records_saved_total: Arc<AtomicU64>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

pub struct WorkerConfig {
    pub interval_secs: u64,
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        sampler,
        store,
        host,
        records_saved_total,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig { interval_secs } = config;

    let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", interval_secs, %host);

    let run = async move {
        let mut tick = interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let record = match sampler.sample_async().await {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "sample", "sampling failed");
                            continue;
                        }
                    };
                    match store.save_record(&host, &record, chrono::Utc::now()).await {
                        Ok(()) => {
                            let total = records_saved_total.fetch_add(1, Ordering::Relaxed) + 1;
                            tracing::debug!(
                                operation = "save_record",
                                records_saved_total = total,
                                "sample saved"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                operation = "save_record",
                                "failed to persist sample"
                            );
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
            }
        }
    };

    tokio::spawn(run.instrument(worker_span))
}
