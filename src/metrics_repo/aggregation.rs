// Per-host averages across the four series, all-time or within a look-back window.
// Results are assembled in a local map inside one read transaction; any failure drops it.

use tracing::instrument;

use super::MetricsRepo;
use crate::error::StoreResult;
use crate::interval::IntervalSpec;
use crate::models::{HostStats, HostStatsMap};

const MEMORY_BY_HOST: &str = "SELECT host, AVG(memory_usage) FROM memory_usage GROUP BY host";
const CPU_BY_HOST: &str = "SELECT host, AVG(cpu_usage) FROM cpu_usage GROUP BY host";
const DISK_BY_HOST: &str = "SELECT host, AVG(read), AVG(write) FROM disk_usage GROUP BY host";
const NETWORK_BY_HOST: &str =
    "SELECT host, AVG(received), AVG(sent) FROM network_usage GROUP BY host";

const HOSTS_WITH_MEMORY_SINCE: &str = "SELECT DISTINCT host FROM memory_usage \
     WHERE timestamp >= datetime('now', $1) ORDER BY host";
const MEMORY_FOR_HOST_SINCE: &str = "SELECT AVG(memory_usage) FROM memory_usage \
     WHERE host = $1 AND timestamp >= datetime('now', $2)";
const CPU_FOR_HOST_SINCE: &str = "SELECT AVG(cpu_usage) FROM cpu_usage \
     WHERE host = $1 AND timestamp >= datetime('now', $2)";
const DISK_FOR_HOST_SINCE: &str = "SELECT AVG(read), AVG(write) FROM disk_usage \
     WHERE host = $1 AND timestamp >= datetime('now', $2)";
const NETWORK_FOR_HOST_SINCE: &str = "SELECT AVG(received), AVG(sent) FROM network_usage \
     WHERE host = $1 AND timestamp >= datetime('now', $2)";

impl MetricsRepo {
    /// All-time averages. Hosts are the union over all four series, first seen in the
    /// order memory, cpu, disk, network; fields with no rows stay at 0.
    #[instrument(skip(self), fields(repo = "metrics", operation = "host_averages"))]
    pub async fn host_averages(&self) -> StoreResult<HostStatsMap> {
        let mut tx = self.pool.begin().await?;
        let mut stats = HostStatsMap::new();

        let memory: Vec<(String, Option<f64>)> =
            sqlx::query_as(MEMORY_BY_HOST).fetch_all(&mut *tx).await?;
        for (host, avg) in memory {
            stats.entry(host).or_default().memory = avg.unwrap_or(0.0);
        }

        let cpu: Vec<(String, Option<f64>)> =
            sqlx::query_as(CPU_BY_HOST).fetch_all(&mut *tx).await?;
        for (host, avg) in cpu {
            stats.entry(host).or_default().cpu = avg.unwrap_or(0.0);
        }

        let disk: Vec<(String, Option<f64>, Option<f64>)> =
            sqlx::query_as(DISK_BY_HOST).fetch_all(&mut *tx).await?;
        for (host, read, write) in disk {
            let entry = stats.entry(host).or_default();
            entry.disk_read = read.unwrap_or(0.0);
            entry.disk_write = write.unwrap_or(0.0);
        }

        let network: Vec<(String, Option<f64>, Option<f64>)> =
            sqlx::query_as(NETWORK_BY_HOST).fetch_all(&mut *tx).await?;
        for (host, received, sent) in network {
            let entry = stats.entry(host).or_default();
            entry.network_read = received.unwrap_or(0.0);
            entry.network_write = sent.unwrap_or(0.0);
        }

        tx.commit().await?;
        tracing::debug!(hosts = stats.len(), "all-time host averages");
        Ok(stats)
    }

    /// Averages over samples no older than `window`.
    ///
    /// Only hosts with a memory sample inside the window are reported, even when they
    /// have cpu, disk or network samples there. The all-time query reports the union.
    #[instrument(
        skip(self, window),
        fields(repo = "metrics", operation = "host_averages_within", window = %window)
    )]
    pub async fn host_averages_within(&self, window: &IntervalSpec) -> StoreResult<HostStatsMap> {
        let modifier = window.sqlite_modifier();
        let mut tx = self.pool.begin().await?;

        let hosts: Vec<String> = sqlx::query_scalar(HOSTS_WITH_MEMORY_SINCE)
            .bind(&modifier)
            .fetch_all(&mut *tx)
            .await?;

        let mut stats = HostStatsMap::new();
        for host in hosts {
            let memory: Option<f64> = sqlx::query_scalar(MEMORY_FOR_HOST_SINCE)
                .bind(&host)
                .bind(&modifier)
                .fetch_one(&mut *tx)
                .await?;
            let cpu: Option<f64> = sqlx::query_scalar(CPU_FOR_HOST_SINCE)
                .bind(&host)
                .bind(&modifier)
                .fetch_one(&mut *tx)
                .await?;
            let (disk_read, disk_write): (Option<f64>, Option<f64>) =
                sqlx::query_as(DISK_FOR_HOST_SINCE)
                    .bind(&host)
                    .bind(&modifier)
                    .fetch_one(&mut *tx)
                    .await?;
            let (network_read, network_write): (Option<f64>, Option<f64>) =
                sqlx::query_as(NETWORK_FOR_HOST_SINCE)
                    .bind(&host)
                    .bind(&modifier)
                    .fetch_one(&mut *tx)
                    .await?;

            stats.insert(
                host,
                HostStats {
                    memory: memory.unwrap_or(0.0),
                    cpu: cpu.unwrap_or(0.0),
                    disk_read: disk_read.unwrap_or(0.0),
                    disk_write: disk_write.unwrap_or(0.0),
                    network_read: network_read.unwrap_or(0.0),
                    network_write: network_write.unwrap_or(0.0),
                },
            );
        }

        tx.commit().await?;
        tracing::debug!(hosts = stats.len(), "windowed host averages");
        Ok(stats)
    }
}
