//! Store doubles.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use orderline_core::{Order, StorageError, StorageResult};
use orderline_storage::{InMemoryOrderStore, OrderStore};
use parking_lot::Mutex;

/// Per-operation call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCallCounts {
    pub creates: usize,
    pub gets: usize,
    pub lists: usize,
    pub closes: usize,
}

/// In-memory store that records how often each operation is called.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: InMemoryOrderStore,
    creates: AtomicUsize,
    gets: AtomicUsize,
    lists: AtomicUsize,
    closes: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            inner: InMemoryOrderStore::with_orders(orders),
            ..Self::default()
        }
    }

    pub fn counts(&self) -> StoreCallCounts {
        StoreCallCounts {
            creates: self.creates.load(Ordering::SeqCst),
            gets: self.gets.load(Ordering::SeqCst),
            lists: self.lists.load(Ordering::SeqCst),
            closes: self.closes.load(Ordering::SeqCst),
        }
    }

    /// The wrapped store, for inspecting contents without counting.
    pub fn inner(&self) -> &InMemoryOrderStore {
        &self.inner
    }
}

#[async_trait]
impl OrderStore for CountingStore {
    async fn create(&self, order: &Order) -> StorageResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(order).await
    }

    async fn get_by_id(&self, order_uid: &str) -> StorageResult<Order> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(order_uid).await
    }

    async fn list_all(&self) -> StorageResult<Vec<Order>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list_all().await
    }

    async fn close(&self) -> StorageResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

/// In-memory store with injectable failures.
///
/// Queued failures are consumed one per call, in order; once the queue is
/// empty calls go to the wrapped store.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    inner: InMemoryOrderStore,
    create_failures: Mutex<VecDeque<StorageError>>,
    get_failures: Mutex<VecDeque<StorageError>>,
    list_failures: Mutex<VecDeque<StorageError>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            inner: InMemoryOrderStore::with_orders(orders),
            ..Self::default()
        }
    }

    /// Fail the next `create` with `error`.
    pub fn fail_next_create(&self, error: StorageError) -> &Self {
        self.create_failures.lock().push_back(error);
        self
    }

    /// Fail the next `get_by_id` with `error`.
    pub fn fail_next_get(&self, error: StorageError) -> &Self {
        self.get_failures.lock().push_back(error);
        self
    }

    /// Fail the next `list_all` with `error`.
    pub fn fail_next_list(&self, error: StorageError) -> &Self {
        self.list_failures.lock().push_back(error);
        self
    }

    pub fn inner(&self) -> &InMemoryOrderStore {
        &self.inner
    }
}

#[async_trait]
impl OrderStore for ScriptedStore {
    async fn create(&self, order: &Order) -> StorageResult<()> {
        let scripted = self.create_failures.lock().pop_front();
        match scripted {
            Some(error) => Err(error),
            None => self.inner.create(order).await,
        }
    }

    async fn get_by_id(&self, order_uid: &str) -> StorageResult<Order> {
        let scripted = self.get_failures.lock().pop_front();
        match scripted {
            Some(error) => Err(error),
            None => self.inner.get_by_id(order_uid).await,
        }
    }

    async fn list_all(&self) -> StorageResult<Vec<Order>> {
        let scripted = self.list_failures.lock().pop_front();
        match scripted {
            Some(error) => Err(error),
            None => self.inner.list_all().await,
        }
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::valid_order;

    #[tokio::test]
    async fn test_counting_store_counts() {
        let store = CountingStore::with_orders(vec![valid_order("order-00001")]);
        store.get_by_id("order-00001").await.unwrap();
        store.get_by_id("missing").await.unwrap_err();
        store.list_all().await.unwrap();
        assert_eq!(
            store.counts(),
            StoreCallCounts {
                creates: 0,
                gets: 2,
                lists: 1,
                closes: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed_in_order() {
        let store = ScriptedStore::new();
        store
            .fail_next_create(StorageError::Unavailable {
                reason: "db down".to_string(),
            })
            .fail_next_create(StorageError::QueryFailed {
                reason: "deadlock".to_string(),
            });

        let order = valid_order("order-00001");
        assert!(matches!(
            store.create(&order).await,
            Err(StorageError::Unavailable { .. })
        ));
        assert!(matches!(
            store.create(&order).await,
            Err(StorageError::QueryFailed { .. })
        ));
        assert!(store.create(&order).await.is_ok());
        assert!(store.inner().contains("order-00001"));
    }
}
