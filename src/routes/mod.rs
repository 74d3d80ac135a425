// HTTP routes

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::metrics_repo::MetricsRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    /// None when the database could not be opened at startup.
    pub(crate) store: Option<Arc<MetricsRepo>>,
}

pub fn app(store: Option<Arc<MetricsRepo>>) -> Router {
    let state = AppState { store };
    Router::new()
        .route("/", get(http::all_time_handler)) // GET /
        .route("/limit/{token}", get(http::windowed_handler)) // GET /limit/{token}
        .route("/version", get(http::version_handler)) // GET /version
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
