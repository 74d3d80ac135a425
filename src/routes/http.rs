// GET handlers: all-time and windowed host averages, version

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use std::sync::Arc;

use super::AppState;
use crate::error::ApiError;
use crate::interval::IntervalSpec;
use crate::metrics_repo::MetricsRepo;
use crate::models::HostStatsMap;
use crate::version::{NAME, VERSION};

fn store(state: &AppState) -> Result<&Arc<MetricsRepo>, ApiError> {
    state.store.as_ref().ok_or(ApiError::Unavailable)
}

/// GET / — all-time per-host averages.
pub(super) async fn all_time_handler(
    State(state): State<AppState>,
) -> Result<Json<HostStatsMap>, ApiError> {
    let stats = store(&state)?.host_averages().await?;
    Ok(Json(stats))
}

/// GET /limit/{token} — per-host averages over the last `token` (e.g. "1h", "7d").
/// The token is validated before the store is touched.
pub(super) async fn windowed_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<HostStatsMap>, ApiError> {
    let window = IntervalSpec::parse(&token)?;
    let stats = store(&state)?.host_averages_within(&window).await?;
    Ok(Json(stats))
}

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}
