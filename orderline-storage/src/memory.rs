//! In-memory order store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use orderline_core::{Order, StorageError, StorageResult};
use parking_lot::RwLock;

use crate::store::OrderStore;

#[derive(Debug, Default)]
struct Inner {
    orders: HashMap<String, Order>,
    /// Insertion order, so `list_all` is stable.
    order_uids: Vec<String>,
}

/// `OrderStore` backed by a process-local map.
///
/// Used by the `memory` store mode of the server and throughout the tests.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<Inner>,
    closed: AtomicBool,
}

impl InMemoryOrderStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `orders`, skipping duplicate ids.
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            for order in orders {
                if inner.orders.contains_key(&order.order_uid) {
                    continue;
                }
                inner.order_uids.push(order.order_uid.clone());
                inner.orders.insert(order.order_uid.clone(), order);
            }
        }
        store
    }

    /// Number of stored orders.
    pub fn len(&self) -> usize {
        self.inner.read().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an order with this id is stored.
    pub fn contains(&self, order_uid: &str) -> bool {
        self.inner.read().orders.contains_key(order_uid)
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Unavailable {
                reason: "store is closed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &Order) -> StorageResult<()> {
        self.ensure_open()?;
        let mut inner = self.inner.write();
        if inner.orders.contains_key(&order.order_uid) {
            return Err(StorageError::Conflict {
                order_uid: order.order_uid.clone(),
            });
        }
        inner.order_uids.push(order.order_uid.clone());
        inner.orders.insert(order.order_uid.clone(), order.clone());
        Ok(())
    }

    async fn get_by_id(&self, order_uid: &str) -> StorageResult<Order> {
        self.ensure_open()?;
        self.inner
            .read()
            .orders
            .get(order_uid)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                order_uid: order_uid.to_string(),
            })
    }

    async fn list_all(&self) -> StorageResult<Vec<Order>> {
        self.ensure_open()?;
        let inner = self.inner.read();
        Ok(inner
            .order_uids
            .iter()
            .filter_map(|uid| inner.orders.get(uid).cloned())
            .collect())
    }

    async fn close(&self) -> StorageResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(uid: &str) -> Order {
        Order {
            order_uid: uid.to_string(),
            ..Order::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = InMemoryOrderStore::new();
        store.create(&order("order-1")).await.unwrap();
        let loaded = store.get_by_id("order-1").await.unwrap();
        assert_eq!(loaded.order_uid, "order-1");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts_and_keeps_original() {
        let store = InMemoryOrderStore::new();
        let mut first = order("order-1");
        first.track_number = "FIRST".to_string();
        store.create(&first).await.unwrap();

        let mut second = order("order-1");
        second.track_number = "SECOND".to_string();
        let err = store.create(&second).await.unwrap_err();
        assert_eq!(
            err,
            StorageError::Conflict {
                order_uid: "order-1".to_string()
            }
        );
        assert_eq!(
            store.get_by_id("order-1").await.unwrap().track_number,
            "FIRST"
        );
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = InMemoryOrderStore::new();
        assert!(matches!(
            store.get_by_id("missing").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_all_preserves_insertion_order() {
        let store = InMemoryOrderStore::with_orders(vec![order("c"), order("a"), order("b")]);
        let uids: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.order_uid)
            .collect();
        assert_eq!(uids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_closed_store_is_unavailable() {
        let store = InMemoryOrderStore::new();
        store.close().await.unwrap();
        assert!(matches!(
            store.create(&order("order-1")).await,
            Err(StorageError::Unavailable { .. })
        ));
        assert!(matches!(
            store.list_all().await,
            Err(StorageError::Unavailable { .. })
        ));
    }
}
