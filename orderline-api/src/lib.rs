//! Orderline API - Query Surface and Server Wiring
//!
//! Serves cached order lookups over HTTP, provides the Postgres
//! [`OrderStore`] implementation, and wires the ingestion pipeline, cache,
//! and store together for the `orderline` binary.

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use orderline_storage::{InMemoryOrderStore, OrderStore};

pub use config::{ServerConfig, StoreKind};
pub use db::{DbConfig, PgOrderStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use state::AppState;

/// Build the configured store.
pub fn build_store(kind: StoreKind, db: &DbConfig) -> ApiResult<Arc<dyn OrderStore>> {
    let store: Arc<dyn OrderStore> = match kind {
        StoreKind::Postgres => {
            tracing::info!(host = %db.host, port = db.port, dbname = %db.dbname, "Using Postgres store");
            Arc::new(PgOrderStore::from_config(db)?)
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; orders are lost on exit");
            Arc::new(InMemoryOrderStore::new())
        }
    };
    Ok(store)
}
