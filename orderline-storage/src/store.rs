//! Durable order store contract.
//!
//! The cache and the ingestion pipeline depend on this trait only. Concrete
//! stores live next to their drivers: [`crate::InMemoryOrderStore`] here and
//! the Postgres store in the API crate.

use std::sync::Arc;

use async_trait::async_trait;
use orderline_core::{Order, StorageResult};

/// Async store for orders.
///
/// Implementations must be internally synchronized; a single handle is shared
/// between the ingestion task and every lookup.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order.
    ///
    /// Create-only: an existing `order_uid` yields `StorageError::Conflict`
    /// and leaves the stored copy untouched.
    async fn create(&self, order: &Order) -> StorageResult<()>;

    /// Load one order. Absent ids yield `StorageError::NotFound`.
    async fn get_by_id(&self, order_uid: &str) -> StorageResult<Order>;

    /// Load every stored order.
    async fn list_all(&self) -> StorageResult<Vec<Order>>;

    /// Release underlying resources. Later calls fail with `Unavailable`.
    async fn close(&self) -> StorageResult<()>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn create(&self, order: &Order) -> StorageResult<()> {
        (**self).create(order).await
    }

    async fn get_by_id(&self, order_uid: &str) -> StorageResult<Order> {
        (**self).get_by_id(order_uid).await
    }

    async fn list_all(&self) -> StorageResult<Vec<Order>> {
        (**self).list_all().await
    }

    async fn close(&self) -> StorageResult<()> {
        (**self).close().await
    }
}
