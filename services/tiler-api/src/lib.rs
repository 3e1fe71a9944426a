//! Survey grid tiler HTTP service.
//!
//! Exposes the router and its modules so the binary and the integration
//! tests build the same application.

pub mod cleanup;
pub mod handlers;
pub mod metrics;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the application router.
pub fn app(state: Arc<AppState>, prometheus_handle: PrometheusHandle) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        // Upload form
        .route("/", get(handlers::index::index_handler))
        // Runs
        .route("/runs", post(handlers::runs::create_run_handler))
        .route("/runs/:run_id", get(handlers::runs::get_run_handler))
        .route(
            "/runs/:run_id/files/:name",
            get(handlers::artifacts::artifact_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(Extension(state))
        .layer(Extension(prometheus_handle))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
