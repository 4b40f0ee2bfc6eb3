//! Cache-aside read path.
//!
//! Routes point lookups to the cache first and falls back to the store on a
//! miss, backfilling the cache with whatever the store returned. Concurrent
//! misses for one key may each reach the store; the last backfill wins.

use std::sync::Arc;

use orderline_core::{Order, StorageError};
use serde::Serialize;
use thiserror::Error;

use crate::cache::OrderCache;
use crate::store::OrderStore;

/// Where a lookup was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupSource {
    Cache,
    Store,
}

impl LookupSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupSource::Cache => "cache",
            LookupSource::Store => "store",
        }
    }
}

/// A successful lookup with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRead {
    pub order: Order,
    pub source: LookupSource,
}

impl OrderRead {
    pub fn was_cache_hit(&self) -> bool {
        self.source == LookupSource::Cache
    }

    pub fn into_order(self) -> Order {
        self.order
    }
}

/// Lookup failures as seen by the query surface.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Order not found: {order_uid}")]
    NotFound { order_uid: String },

    #[error("Lookup failed: {0}")]
    Internal(StorageError),
}

impl From<StorageError> for LookupError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { order_uid } => LookupError::NotFound { order_uid },
            other => LookupError::Internal(other),
        }
    }
}

/// Cache-aside reader over a shared cache and store.
pub struct CachedOrderReader<S: ?Sized> {
    cache: Arc<OrderCache>,
    store: Arc<S>,
}

impl<S: OrderStore + ?Sized> CachedOrderReader<S> {
    pub fn new(cache: Arc<OrderCache>, store: Arc<S>) -> Self {
        Self { cache, store }
    }

    pub fn cache(&self) -> &Arc<OrderCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Look up an order by id.
    ///
    /// A cache hit never touches the store. On a miss the store result is
    /// written back into the cache before being returned.
    pub async fn lookup(&self, order_uid: &str) -> Result<OrderRead, LookupError> {
        if let Some(order) = self.cache.get(order_uid) {
            tracing::debug!(order_uid, "Order served from cache");
            return Ok(OrderRead {
                order,
                source: LookupSource::Cache,
            });
        }

        let order = match self.store.get_by_id(order_uid).await {
            Ok(order) => order,
            Err(StorageError::NotFound { .. }) => {
                tracing::debug!(order_uid, "Order not found");
                return Err(LookupError::NotFound {
                    order_uid: order_uid.to_string(),
                });
            }
            Err(e) => {
                tracing::error!(order_uid, error = %e, "Order lookup failed");
                return Err(LookupError::Internal(e));
            }
        };

        self.cache.set(order.order_uid.clone(), order.clone());
        tracing::debug!(order_uid, "Order loaded from store and cached");
        Ok(OrderRead {
            order,
            source: LookupSource::Store,
        })
    }
}

impl<S: ?Sized> Clone for CachedOrderReader<S> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            store: Arc::clone(&self.store),
        }
    }
}
