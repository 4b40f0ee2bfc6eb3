//! REST API Routes
//!
//! - `GET /order/{order_uid}` - cache-aside order lookup
//! - `GET /health`, `GET /stats`, `GET /metrics` - observability

pub mod health;
pub mod order;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use health::create_router as health_router;
pub use order::create_router as order_router;

/// Build the full application router.
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .merge(order_router())
        .merge(health_router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
