use anyhow::Result;
use hoststats::metrics_repo::MetricsRepo;
use hoststats::*;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let app_config = config::AppConfig::load()?;

    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let store = open_store(&app_config.database).await;

    let worker = match (&store, app_config.sampler.enabled) {
        (Some(store), true) => {
            let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
            let sampler = sampler::Sampler::from_config(&app_config.sampler);
            let host = app_config.sampler.host_name();
            tracing::info!(
                source = ?sampler.source_kind(),
                %host,
                interval_secs = app_config.sampler.interval_secs,
                "Background sampling enabled"
            );
            let handle = worker::spawn(
                worker::WorkerDeps {
                    sampler,
                    store: store.clone(),
                    host,
                    records_saved_total: Arc::new(AtomicU64::new(0)),
                    shutdown_rx,
                },
                worker::WorkerConfig {
                    interval_secs: app_config.sampler.interval_secs,
                },
            );
            Some((shutdown_tx, handle))
        }
        (None, true) => {
            tracing::warn!("Background sampling disabled: metrics store unavailable");
            None
        }
        _ => None,
    };

    let app = routes::app(store.clone());
    tracing::info!("Listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some((shutdown_tx, handle)) = worker {
        let _ = shutdown_tx.send(());
        let _ = handle.await;
    }
    if let Some(store) = store {
        store.close().await;
        tracing::debug!("Metrics store closed");
    }

    served?;
    Ok(())
}

/// Opens and initializes the store. Failure is logged and the server runs without one,
/// answering 503 on the query endpoints.
async fn open_store(config: &config::DatabaseConfig) -> Option<Arc<MetricsRepo>> {
    let repo = match MetricsRepo::connect(config).await {
        Ok(repo) => repo,
        Err(e) => {
            tracing::warn!(error = %e, path = %config.path, "Failed to open metrics store");
            return None;
        }
    };
    if let Err(e) = repo.init().await {
        tracing::warn!(error = %e, path = %config.path, "Failed to initialize metrics store");
        repo.close().await;
        return None;
    }
    Some(Arc::new(repo))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    tracing::info!("Received shutdown signal");
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Received shutdown signal");
}
