//! Prometheus Metrics Definitions
//!
//! Lookup counters and latency for `GET /order/{order_uid}` and a gauge for
//! the cache size. Exposed at `/metrics` for scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_int_gauge, CounterVec, Encoder, Histogram,
    IntGauge, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// Lookup latency buckets (seconds)
/// Covers: 100µs, 500µs, 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s
const LOOKUP_LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<OrderlineMetrics>> = Lazy::new(OrderlineMetrics::new);

/// Container for all Orderline metrics.
#[derive(Clone)]
pub struct OrderlineMetrics {
    /// Lookup counter - labels: source (cache/store/none), outcome (found/not_found/error)
    pub lookups_total: CounterVec,

    /// Lookup duration histogram
    pub lookup_duration_seconds: Histogram,

    /// Entries currently cached
    pub cache_entries: IntGauge,
}

impl OrderlineMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            lookups_total: register_counter_vec!(
                "orderline_lookups_total",
                "Total number of order lookups",
                &["source", "outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register lookups_total: {}", e)))?,

            lookup_duration_seconds: register_histogram!(
                "orderline_lookup_duration_seconds",
                "Order lookup duration in seconds",
                LOOKUP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register lookup_duration_seconds: {}", e))
            })?,

            cache_entries: register_int_gauge!(
                "orderline_cache_entries",
                "Current number of cached orders"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_entries: {}", e)))?,
        })
    }

    /// Record one lookup.
    pub fn record_lookup(&self, source: &str, outcome: &str, duration_secs: f64) {
        self.lookups_total
            .with_label_values(&[source, outcome])
            .inc();
        self.lookup_duration_seconds.observe(duration_secs);
    }

    pub fn set_cache_entries(&self, entries: usize) {
        self.cache_entries.set(entries as i64);
    }
}

/// Handler for GET /metrics.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
