use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_busy_timeout_secs() -> u64 {
    5
}

/// Which counter source the sampler uses. `auto` picks sysinfo when it supports the OS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePreference {
    #[default]
    Auto,
    Library,
    Proc,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplerConfig {
    #[serde(default)]
    pub source: SourcePreference,
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
    /// Length of the blocking CPU measurement window.
    #[serde(default = "default_cpu_window_ms")]
    pub cpu_window_ms: u64,
    /// Run the background sampling worker inside the query server.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Host name stored with persisted samples; defaults to the system host name.
    #[serde(default)]
    pub host: Option<String>,
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

fn default_cpu_window_ms() -> u64 {
    1000
}

fn default_interval_secs() -> u64 {
    60
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            source: SourcePreference::default(),
            proc_root: default_proc_root(),
            cpu_window_ms: default_cpu_window_ms(),
            enabled: false,
            interval_secs: default_interval_secs(),
            host: None,
        }
    }
}

impl SamplerConfig {
    /// Configured host name, else the system host name, else "localhost".
    pub fn host_name(&self) -> String {
        self.host
            .clone()
            .filter(|h| !h.is_empty())
            .or_else(sysinfo::System::host_name)
            .unwrap_or_else(|| "localhost".into())
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Like `load`, but a missing config file is not an error.
    pub fn load_optional() -> anyhow::Result<Option<Self>> {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(s) => Self::load_from_str(&s).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.busy_timeout_secs > 0,
            "database.busy_timeout_secs must be > 0, got {}",
            self.database.busy_timeout_secs
        );
        anyhow::ensure!(
            self.sampler.cpu_window_ms > 0,
            "sampler.cpu_window_ms must be > 0, got {}",
            self.sampler.cpu_window_ms
        );
        anyhow::ensure!(
            self.sampler.interval_secs > 0,
            "sampler.interval_secs must be > 0, got {}",
            self.sampler.interval_secs
        );
        anyhow::ensure!(
            !self.sampler.proc_root.as_os_str().is_empty(),
            "sampler.proc_root must be non-empty"
        );
        Ok(())
    }
}

fn config_path() -> String {
    std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into())
}
