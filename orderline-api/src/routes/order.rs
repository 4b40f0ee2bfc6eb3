//! Order lookup.

use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::HeaderName,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use orderline_storage::LookupError;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::telemetry::METRICS;

/// Response header naming where the order came from (`cache` or `store`).
pub const ORDER_SOURCE_HEADER: HeaderName = HeaderName::from_static("x-order-source");

/// GET /order/{order_uid}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_uid): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let start = Instant::now();
    let result = state.reader.lookup(&order_uid).await;
    let elapsed = start.elapsed().as_secs_f64();

    if let Ok(metrics) = METRICS.as_ref() {
        let (source, outcome) = match &result {
            Ok(read) => (read.source.as_str(), "found"),
            Err(LookupError::NotFound { .. }) => ("store", "not_found"),
            Err(LookupError::Internal(_)) => ("store", "error"),
        };
        metrics.record_lookup(source, outcome, elapsed);
    }

    let read = result?;
    Ok((
        [(ORDER_SOURCE_HEADER, read.source.as_str())],
        Json(read.into_order()),
    ))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/order/:order_uid", get(get_order))
}
