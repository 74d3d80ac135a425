// One-shot sampler: prints a single JSON metrics record on stdout.
// With --persist, also stores it under this host in the configured database.

use anyhow::Result;
use hoststats::config::{AppConfig, SamplerConfig};
use hoststats::metrics_repo::MetricsRepo;
use hoststats::{logging, sampler::Sampler};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_stderr();

    let persist = std::env::args().skip(1).any(|a| a == "--persist");
    let config = AppConfig::load_optional()?;
    let sampler_config: SamplerConfig = config
        .as_ref()
        .map(|c| c.sampler.clone())
        .unwrap_or_default();

    let sampler = Sampler::from_config(&sampler_config);
    tracing::debug!(source = ?sampler.source_kind(), "sampling");
    let record = sampler.sample_async().await?;
    println!("{}", record.to_json_line()?);

    if persist {
        let Some(config) = config else {
            anyhow::bail!("--persist needs a config file (set CONFIG_FILE)");
        };
        let repo = MetricsRepo::connect(&config.database).await?;
        let saved = async {
            repo.init().await?;
            repo.save_record(&sampler_config.host_name(), &record, chrono::Utc::now())
                .await?;
            anyhow::Ok(())
        }
        .await;
        repo.close().await;
        saved?;
    }

    Ok(())
}
