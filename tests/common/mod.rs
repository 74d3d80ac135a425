// Shared test helpers

#![allow(dead_code)]

use hoststats::config::DatabaseConfig;
use hoststats::metrics_repo::MetricsRepo;
use tempfile::TempDir;

pub fn database_config(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        path: dir.path().join("metrics.db").to_string_lossy().into_owned(),
        max_pool_size: 2,
        busy_timeout_secs: 5,
    }
}

/// Fresh, initialized store in a temp dir. Keep the TempDir alive for the test's duration.
pub async fn temp_repo() -> (TempDir, MetricsRepo) {
    let dir = TempDir::new().unwrap();
    let repo = MetricsRepo::connect(&database_config(&dir)).await.unwrap();
    repo.init().await.unwrap();
    (dir, repo)
}

/// Writes a fake /proc tree (stat, meminfo, diskstats, net/dev) into `dir`.
pub fn write_proc_tree(dir: &std::path::Path, stat: &str, meminfo: &str, diskstats: &str, net_dev: &str) {
    std::fs::create_dir_all(dir.join("net")).unwrap();
    std::fs::write(dir.join("stat"), stat).unwrap();
    std::fs::write(dir.join("meminfo"), meminfo).unwrap();
    std::fs::write(dir.join("diskstats"), diskstats).unwrap();
    std::fs::write(dir.join("net/dev"), net_dev).unwrap();
}

pub const MEMINFO: &str = "MemTotal:        8000000 kB\n\
MemFree:         2000000 kB\n\
Buffers:          500000 kB\n\
Cached:          1500000 kB\n";

pub const DISKSTATS: &str = "   8       0 sda 1000 0 0 0 2000 0 0 0 0 0 0 0 0 0 0 0 0\n\
   8       1 sda1 100 0 0 0 200 0 0 0 0 0 0 0 0 0 0 0 0\n";

pub const NET_DEV: &str = "Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:    1000     100    0    0    0     0          0         0     1000     100    0    0    0     0       0          0
  eth0:   50000     500    0    0    0     0          0         0    25000     250    0    0    0     0       0          0
";

pub const STAT: &str = "cpu  100 0 100 800 0 0 0 0 0 0\ncpu0 100 0 100 800 0 0 0 0 0 0\n";
