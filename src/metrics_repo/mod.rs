// SQLite metrics store: four append-only series keyed by (host, timestamp).
// Writes come from the sampler; the query service only reads (see aggregation).

pub mod aggregation;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;

use crate::config::DatabaseConfig;
use crate::error::StoreResult;
use crate::models::MetricsRecord;

/// Matches SQLite's CURRENT_TIMESTAMP text so `datetime('now', ..)` comparisons work.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SERIES_TABLES: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS memory_usage (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        host TEXT NOT NULL,
        timestamp DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        memory_usage REAL NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cpu_usage (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        host TEXT NOT NULL,
        timestamp DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        cpu_usage REAL NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS disk_usage (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        host TEXT NOT NULL,
        timestamp DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        read INTEGER NOT NULL,
        write INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS network_usage (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        host TEXT NOT NULL,
        timestamp DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        received INTEGER NOT NULL,
        sent INTEGER NOT NULL
    )
    "#,
];

const SERIES_INDEXES: [&str; 4] = [
    "CREATE INDEX IF NOT EXISTS idx_memory_usage_host_ts ON memory_usage(host, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_cpu_usage_host_ts ON cpu_usage(host, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_disk_usage_host_ts ON disk_usage(host, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_network_usage_host_ts ON network_usage(host, timestamp)",
];

pub struct MetricsRepo {
    pool: SqlitePool,
}

impl MetricsRepo {
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(&config.path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        for ddl in SERIES_TABLES.iter().chain(SERIES_INDEXES.iter()) {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Closes every pooled connection. Queries issued afterwards fail as unavailable.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Writes one row into each series in a single transaction.
    #[instrument(skip(self, record), fields(repo = "metrics", operation = "save_record"))]
    pub async fn save_record(
        &self,
        host: &str,
        record: &MetricsRecord,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let ts = format_timestamp(at);
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO memory_usage (host, timestamp, memory_usage) VALUES ($1, $2, $3)")
            .bind(host)
            .bind(&ts)
            .bind(record.memory_usage_percent)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO cpu_usage (host, timestamp, cpu_usage) VALUES ($1, $2, $3)")
            .bind(host)
            .bind(&ts)
            .bind(record.cpu_usage_percent)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO disk_usage (host, timestamp, read, write) VALUES ($1, $2, $3, $4)")
            .bind(host)
            .bind(&ts)
            .bind(clamp_i64(record.disk_usage_read))
            .bind(clamp_i64(record.disk_usage_write))
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO network_usage (host, timestamp, received, sent) VALUES ($1, $2, $3, $4)",
        )
        .bind(host)
        .bind(&ts)
        .bind(clamp_i64(record.network_usage_received))
        .bind(clamp_i64(record.network_usage_sent))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_memory(&self, host: &str, at: DateTime<Utc>, percent: f64) -> StoreResult<()> {
        sqlx::query("INSERT INTO memory_usage (host, timestamp, memory_usage) VALUES ($1, $2, $3)")
            .bind(host)
            .bind(format_timestamp(at))
            .bind(percent)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_cpu(&self, host: &str, at: DateTime<Utc>, percent: f64) -> StoreResult<()> {
        sqlx::query("INSERT INTO cpu_usage (host, timestamp, cpu_usage) VALUES ($1, $2, $3)")
            .bind(host)
            .bind(format_timestamp(at))
            .bind(percent)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_disk(
        &self,
        host: &str,
        at: DateTime<Utc>,
        read: u64,
        write: u64,
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO disk_usage (host, timestamp, read, write) VALUES ($1, $2, $3, $4)")
            .bind(host)
            .bind(format_timestamp(at))
            .bind(clamp_i64(read))
            .bind(clamp_i64(write))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_network(
        &self,
        host: &str,
        at: DateTime<Utc>,
        received: u64,
        sent: u64,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO network_usage (host, timestamp, received, sent) VALUES ($1, $2, $3, $4)",
        )
        .bind(host)
        .bind(format_timestamp(at))
        .bind(clamp_i64(received))
        .bind(clamp_i64(sent))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// SQLite INTEGER is signed 64-bit.
fn clamp_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_matches_sqlite_text_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_timestamp(at), "2024-03-09 07:05:01");
    }

    #[test]
    fn counters_above_i64_saturate() {
        assert_eq!(clamp_i64(42), 42);
        assert_eq!(clamp_i64(u64::MAX), i64::MAX);
    }
}
