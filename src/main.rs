// Main entry point - Dependency injection and server setup
use anyhow::Context;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use bench_telemetry::application::dashboard_service::DashboardService;
use bench_telemetry::application::ingest_service::{IngestPipeline, SharedStore};
use bench_telemetry::application::sample_source::ChannelSource;
use bench_telemetry::domain::window::WindowPolicy;
use bench_telemetry::infrastructure::config::load_config;
use bench_telemetry::presentation::app_state::AppState;
use bench_telemetry::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration
    let config = load_config().context("Failed to load configuration")?;

    // One store per dashboard session, written by the ingest task only
    let store = SharedStore::default();
    let (interval_tx, interval_rx) = watch::channel(config.window.interval());
    let (revision_tx, revision_rx) = watch::channel(0u64);

    let pipeline = IngestPipeline::new(
        store.clone(),
        WindowPolicy::new(config.window.eviction),
        interval_rx,
        revision_tx,
    );
    let (samples, source) = ChannelSource::channel(config.ingest.channel_capacity);
    let ingest = pipeline.spawn(source);

    let state = Arc::new(AppState {
        dashboard_service: DashboardService::new(store, interval_tx, revision_rx),
        samples,
    });
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!(
        "Starting bench-telemetry service on {} (window {}s)",
        config.server.bind,
        config.window.interval_secs
    );

    // Unsubscribe ingest first so dashboard streams end and the server can drain.
    let shutdown = async move {
        shutdown_signal().await;
        if let Err(e) = ingest.shutdown().await {
            tracing::error!("Ingest pipeline did not stop cleanly: {:#}", e);
        }
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("bench-telemetry stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown requested"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
