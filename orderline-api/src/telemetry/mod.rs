//! Orderline Telemetry
//!
//! Structured logging through `tracing-subscriber` and Prometheus metrics for
//! the query surface.

pub mod metrics;
pub mod subscriber;

pub use metrics::{metrics_handler, OrderlineMetrics, METRICS};
pub use subscriber::{init_tracing, LogFormat, TelemetryConfig};
