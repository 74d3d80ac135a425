// tracing-subscriber setup shared by both binaries: env filter (default "info") + local-time stamps.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Logs to stdout.
pub fn init() {
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(env_filter())
        .init();
}

/// Logs to stderr, keeping stdout free for machine-readable output.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}
