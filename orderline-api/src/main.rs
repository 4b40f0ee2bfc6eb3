//! Orderline Server Entry Point
//!
//! Boots the store and cache, warms the cache, runs the ingestion pipeline
//! over a JSON-lines source, and serves the HTTP query surface until Ctrl-C.

use std::sync::Arc;

use orderline_api::telemetry::{init_tracing, TelemetryConfig};
use orderline_api::{build_store, create_api_router, ApiError, ApiResult, AppState, DbConfig, ServerConfig};
use orderline_ingest::{IngestConfig, IngestPipeline, JsonLinesSource, MessageSource};
use orderline_storage::{CacheConfig, OrderCache};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::default())?;

    let server_config = ServerConfig::from_env()?;
    let ingest_config = IngestConfig::from_env()?;
    let cache_config = CacheConfig::from_env();

    let store = build_store(server_config.store, &DbConfig::from_env())?;
    let cache = OrderCache::start(cache_config);

    match cache.load_from_store(Some(store.as_ref())).await {
        Ok(loaded) => tracing::info!(loaded, "Cache warmed from store"),
        Err(e) => tracing::warn!(error = %e, "Cache warm-up failed; starting cold"),
    }

    let source: Box<dyn MessageSource> = match &ingest_config.source_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Reading orders from file");
            Box::new(JsonLinesSource::open(path).await.map_err(|e| {
                ApiError::invalid_input(format!("Cannot open order source: {}", e))
            })?)
        }
        None => {
            tracing::info!("Reading orders from stdin");
            Box::new(JsonLinesSource::stdin().map_err(|e| {
                ApiError::internal_error(format!("Cannot read standard input: {}", e))
            })?)
        }
    };

    let pipeline = IngestPipeline::new(source, Arc::clone(&store), Arc::clone(&cache), ingest_config);
    let state = AppState::new(Arc::clone(&cache), Arc::clone(&store))
        .with_ingest_metrics(pipeline.metrics());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pipeline_handle = tokio::spawn(pipeline.run(shutdown_rx));

    let app = create_api_router(state);
    let addr = server_config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!(%addr, store = %server_config.store, "Starting Orderline API server");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await;

    let _ = shutdown_tx.send(true);
    match pipeline_handle.await {
        Ok(metrics) => {
            let snapshot = metrics.snapshot();
            tracing::info!(stored = snapshot.stored, rejected = snapshot.rejected(), "Pipeline drained");
        }
        Err(e) => tracing::error!(error = %e, "Pipeline task failed"),
    }

    if let Err(e) = store.close().await {
        tracing::warn!(error = %e, "Failed to close store");
    }

    served.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))
}
