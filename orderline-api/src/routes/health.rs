//! Health and Statistics Endpoints
//!
//! - /health - Liveness with uptime and cache size
//! - /stats - Cache counters and ingest counters as JSON
//! - /metrics - Prometheus scrape endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use orderline_ingest::IngestSnapshot;
use orderline_storage::CacheStats;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::telemetry::{metrics_handler, METRICS};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub cache_entries: usize,
}

/// Statistics response
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: CacheStats,
    pub cache_hit_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestSnapshot>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        cache_entries: state.cache().len(),
    };
    (StatusCode::OK, Json(response))
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache().stats();
    Json(StatsResponse {
        cache_hit_rate: cache.hit_rate(),
        cache,
        ingest: state.ingest.as_ref().map(|metrics| metrics.snapshot()),
    })
}

/// GET /metrics - refreshes the cache gauge, then encodes the registry.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.set_cache_entries(state.cache().len());
    }
    metrics_handler().await
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(metrics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            cache_entries: 12,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"uptime_seconds\":3600"));
    }

    #[test]
    fn test_stats_omits_ingest_when_absent() {
        let response = StatsResponse {
            cache: CacheStats::default(),
            cache_hit_rate: 0.0,
            ingest: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"cache\""));
        assert!(!json.contains("\"ingest\""));
    }
}
