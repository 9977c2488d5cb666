// Router - Routes for producers and dashboard readers
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    dashboard, get_interval, health_check, ingest_frames, ingest_sample, latest_data, list_ports,
    series_table, set_interval, stream_dashboard,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/ports", get(list_ports))
        .route("/latest", get(latest_data))
        .route("/tables/:measurement", get(series_table))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/stream", get(stream_dashboard))
        .route("/interval", get(get_interval).put(set_interval))
        .route("/samples", post(ingest_sample))
        .route("/ports/:port/frames", post(ingest_frames))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
