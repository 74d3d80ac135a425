// Aggregation engine tests: all-time union, windowed host restriction, zero baselines

mod common;

use chrono::{Duration, Utc};
use hoststats::interval::IntervalSpec;
use hoststats::models::{HostStats, MetricsRecord};

fn window(token: &str) -> IntervalSpec {
    IntervalSpec::parse(token).unwrap()
}

#[tokio::test]
async fn empty_store_yields_empty_maps() {
    let (_dir, repo) = common::temp_repo().await;
    assert!(repo.host_averages().await.unwrap().is_empty());
    assert!(repo.host_averages_within(&window("1h")).await.unwrap().is_empty());
}

#[tokio::test]
async fn all_time_averages_each_series_per_host() {
    let (_dir, repo) = common::temp_repo().await;
    let now = Utc::now();
    repo.insert_memory("alpha", now, 40.0).await.unwrap();
    repo.insert_memory("alpha", now, 60.0).await.unwrap();
    repo.insert_cpu("alpha", now, 10.0).await.unwrap();
    repo.insert_cpu("alpha", now, 20.0).await.unwrap();
    repo.insert_disk("alpha", now, 100, 200).await.unwrap();
    repo.insert_disk("alpha", now, 300, 400).await.unwrap();
    repo.insert_network("alpha", now, 1000, 500).await.unwrap();

    let stats = repo.host_averages().await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(
        stats["alpha"],
        HostStats {
            memory: 50.0,
            cpu: 15.0,
            disk_read: 200.0,
            disk_write: 300.0,
            network_read: 1000.0,
            network_write: 500.0,
        }
    );
}

#[tokio::test]
async fn all_time_includes_host_seen_only_in_network_series() {
    let (_dir, repo) = common::temp_repo().await;
    let now = Utc::now();
    repo.insert_memory("alpha", now, 50.0).await.unwrap();
    repo.insert_network("edge", now, 800, 200).await.unwrap();
    repo.insert_network("edge", now, 1200, 400).await.unwrap();

    let stats = repo.host_averages().await.unwrap();
    assert_eq!(stats.len(), 2);
    let edge = &stats["edge"];
    assert_eq!(edge.memory, 0.0);
    assert_eq!(edge.cpu, 0.0);
    assert_eq!(edge.disk_read, 0.0);
    assert_eq!(edge.disk_write, 0.0);
    assert_eq!(edge.network_read, 1000.0);
    assert_eq!(edge.network_write, 300.0);
    assert_eq!(stats["alpha"].network_read, 0.0);
}

#[tokio::test]
async fn all_time_covers_every_sample_regardless_of_age() {
    let (_dir, repo) = common::temp_repo().await;
    let now = Utc::now();
    repo.insert_cpu("alpha", now - Duration::days(400), 90.0).await.unwrap();
    repo.insert_cpu("alpha", now, 10.0).await.unwrap();

    let stats = repo.host_averages().await.unwrap();
    assert_eq!(stats["alpha"].cpu, 50.0);
}

#[tokio::test]
async fn windowed_excludes_samples_older_than_window() {
    let (_dir, repo) = common::temp_repo().await;
    let now = Utc::now();
    let old = now - Duration::hours(3);
    repo.insert_memory("alpha", old, 10.0).await.unwrap();
    repo.insert_memory("alpha", now, 70.0).await.unwrap();
    repo.insert_cpu("alpha", old, 99.0).await.unwrap();
    repo.insert_cpu("alpha", now, 30.0).await.unwrap();
    repo.insert_disk("alpha", old, 5, 5).await.unwrap();
    repo.insert_network("alpha", now, 10, 20).await.unwrap();

    let stats = repo.host_averages_within(&window("1h")).await.unwrap();
    let alpha = &stats["alpha"];
    assert_eq!(alpha.memory, 70.0);
    assert_eq!(alpha.cpu, 30.0);
    // Only an out-of-window disk sample: baseline.
    assert_eq!(alpha.disk_read, 0.0);
    assert_eq!(alpha.disk_write, 0.0);
    assert_eq!(alpha.network_read, 10.0);
    assert_eq!(alpha.network_write, 20.0);

    let wide = repo.host_averages_within(&window("1d")).await.unwrap();
    assert_eq!(wide["alpha"].memory, 40.0);
    assert_eq!(wide["alpha"].disk_read, 5.0);
}

// Regression: the windowed query lists hosts from the memory series only.
#[tokio::test]
async fn windowed_omits_host_without_memory_samples() {
    let (_dir, repo) = common::temp_repo().await;
    let now = Utc::now();
    repo.insert_memory("alpha", now, 50.0).await.unwrap();
    repo.insert_disk("beta", now, 10, 20).await.unwrap();
    repo.insert_network("beta", now, 30, 40).await.unwrap();
    repo.insert_cpu("beta", now, 5.0).await.unwrap();

    let windowed = repo.host_averages_within(&window("1h")).await.unwrap();
    assert!(windowed.contains_key("alpha"));
    assert!(!windowed.contains_key("beta"));

    let all_time = repo.host_averages().await.unwrap();
    assert!(all_time.contains_key("beta"));
    assert_eq!(all_time["beta"].disk_read, 10.0);
}

#[tokio::test]
async fn windowed_omits_host_whose_memory_samples_are_all_outside_window() {
    let (_dir, repo) = common::temp_repo().await;
    let now = Utc::now();
    repo.insert_memory("stale", now - Duration::days(2), 50.0).await.unwrap();
    repo.insert_cpu("stale", now, 20.0).await.unwrap();

    let windowed = repo.host_averages_within(&window("1h")).await.unwrap();
    assert!(windowed.is_empty());
    let wide = repo.host_averages_within(&window("1w")).await.unwrap();
    assert_eq!(wide["stale"].cpu, 20.0);
}

#[tokio::test]
async fn host_names_are_bound_not_interpolated() {
    let (_dir, repo) = common::temp_repo().await;
    let now = Utc::now();
    let hostile = "x' OR '1'='1";
    repo.insert_memory(hostile, now, 20.0).await.unwrap();
    repo.insert_memory("alpha", now, 80.0).await.unwrap();

    let stats = repo.host_averages_within(&window("1h")).await.unwrap();
    assert_eq!(stats[hostile].memory, 20.0);
    assert_eq!(stats["alpha"].memory, 80.0);
}

#[tokio::test]
async fn save_record_writes_all_four_series() {
    let (_dir, repo) = common::temp_repo().await;
    let record = MetricsRecord {
        cpu_usage_percent: 25.5,
        memory_usage_percent: 60.25,
        disk_usage_read: 1000,
        disk_usage_write: 2000,
        network_usage_received: 5000,
        network_usage_sent: 3000,
        source_capability_flag: false,
    };
    repo.save_record("node-1", &record, Utc::now()).await.unwrap();

    let stats = repo.host_averages_within(&window("5m")).await.unwrap();
    assert_eq!(
        stats["node-1"],
        HostStats {
            memory: 60.25,
            cpu: 25.5,
            disk_read: 1000.0,
            disk_write: 2000.0,
            network_read: 5000.0,
            network_write: 3000.0,
        }
    );
}

#[tokio::test]
async fn closed_store_reports_unavailable() {
    let (_dir, repo) = common::temp_repo().await;
    repo.close().await;
    assert!(repo.is_closed());
    let err = repo.host_averages().await.unwrap_err();
    assert!(matches!(err, hoststats::error::StoreError::Unavailable(_)));
}

#[tokio::test]
async fn init_is_idempotent() {
    let (_dir, repo) = common::temp_repo().await;
    repo.init().await.unwrap();
    assert!(repo.host_averages().await.unwrap().is_empty());
}

#[tokio::test]
async fn week_window_matches_equivalent_day_window() {
    let (_dir, repo) = common::temp_repo().await;
    let now = Utc::now();
    repo.insert_memory("alpha", now, 50.0).await.unwrap();
    repo.insert_memory("alpha", now - Duration::days(6), 70.0).await.unwrap();
    repo.insert_memory("beta", now - Duration::days(10), 30.0).await.unwrap();

    let week = repo.host_averages_within(&window("1w")).await.unwrap();
    let days = repo.host_averages_within(&window("7d")).await.unwrap();
    assert_eq!(week.keys().collect::<Vec<_>>(), ["alpha"]);
    assert_eq!(week["alpha"].memory, 60.0);
    assert_eq!(week, days);

    let two_weeks = repo.host_averages_within(&window("2w")).await.unwrap();
    assert_eq!(two_weeks.keys().collect::<Vec<_>>(), ["alpha", "beta"]);
}

#[tokio::test]
async fn write_blocked_past_busy_timeout_reports_unavailable() {
    use sqlx::Connection;

    let dir = tempfile::TempDir::new().unwrap();
    let config = hoststats::config::DatabaseConfig {
        busy_timeout_secs: 1,
        ..common::database_config(&dir)
    };
    let repo = hoststats::metrics_repo::MetricsRepo::connect(&config).await.unwrap();
    repo.init().await.unwrap();

    let mut holder = sqlx::SqliteConnection::connect(&format!("sqlite://{}", config.path))
        .await
        .unwrap();
    sqlx::query("BEGIN IMMEDIATE").execute(&mut holder).await.unwrap();

    let err = repo.insert_memory("alpha", Utc::now(), 50.0).await.unwrap_err();
    assert!(
        matches!(err, hoststats::error::StoreError::Unavailable(_)),
        "expected unavailable, got {err:?}"
    );

    sqlx::query("ROLLBACK").execute(&mut holder).await.unwrap();
    repo.insert_memory("alpha", Utc::now(), 50.0).await.unwrap();
}
