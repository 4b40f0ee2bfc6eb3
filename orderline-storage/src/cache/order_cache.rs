//! Bounded, time-aware order cache.

use std::sync::Arc;
use std::time::Duration;

use orderline_core::{Order, StorageResult};
use parking_lot::Mutex;
use tokio::time::Instant;

use super::config::CacheConfig;
use super::lru::{CacheState, Lookup};
use super::stats::CacheStats;
use super::sweeper::spawn_expiry_sweeper;
use crate::store::OrderStore;

/// Size-bounded LRU cache of orders with optional TTL.
///
/// All operations take one exclusive lock (a `get` reorders recency) and
/// never perform I/O while holding it. Cache operations cannot fail.
///
/// Expiry is enforced lazily on `get` and, when the cache is created through
/// [`OrderCache::start`], by a background sweep every `ttl / 2`.
#[derive(Debug)]
pub struct OrderCache {
    state: Mutex<CacheState>,
    capacity: usize,
    ttl: Option<Duration>,
    sweep_interval: Option<Duration>,
}

impl OrderCache {
    /// Create a cache without a background sweeper.
    pub fn new(config: CacheConfig) -> Self {
        let capacity = config.max_entries.max(1);
        Self {
            state: Mutex::new(CacheState::with_capacity(capacity)),
            capacity,
            ttl: config.ttl,
            sweep_interval: config.sweep_interval(),
        }
    }

    /// Create a shared cache and start its expiry sweeper on the current runtime.
    pub fn start(config: CacheConfig) -> Arc<Self> {
        let cache = Arc::new(Self::new(config));
        spawn_expiry_sweeper(&cache);
        cache
    }

    /// Get a copy of the cached order and mark it most recently used.
    ///
    /// An entry older than the TTL is removed and reported as absent, even if
    /// the sweeper has not reached it yet.
    pub fn get(&self, order_uid: &str) -> Option<Order> {
        let now = Instant::now();
        match self.state.lock().get(order_uid, now, self.ttl) {
            Lookup::Hit(order) => Some(order),
            Lookup::Miss | Lookup::Expired => None,
        }
    }

    /// Insert or replace an entry and reset its age.
    ///
    /// Inserting a new key into a full cache evicts the least recently used
    /// entry. Replacing an existing key never evicts.
    pub fn set(&self, order_uid: impl Into<String>, order: Order) {
        let now = Instant::now();
        let evicted = self.state.lock().insert(order_uid.into(), order, now);
        if let Some(evicted) = evicted {
            tracing::trace!(order_uid = %evicted, "Evicted least recently used order");
        }
    }

    /// Warm the cache from the store.
    ///
    /// `None` is a no-op. Records are inserted in store order until the
    /// cache is full; the rest are skipped. Returns the number loaded.
    pub async fn load_from_store<S>(&self, store: Option<&S>) -> StorageResult<usize>
    where
        S: OrderStore + ?Sized,
    {
        let Some(store) = store else {
            return Ok(0);
        };

        let orders = store.list_all().await?;
        let available = orders.len();
        let loaded = self.state.lock().load(orders, Instant::now());

        tracing::info!(
            loaded,
            available,
            capacity = self.capacity,
            "Order cache warmed from store"
        );
        Ok(loaded)
    }

    /// Run one expiry pass. Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let now = Instant::now();
        self.state.lock().purge_expired(now, self.ttl)
    }

    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry. Counters are kept.
    pub fn clear(&self) {
        self.state.lock().clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats()
    }

    pub(crate) fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval
    }

    #[cfg(test)]
    pub(crate) fn keys_by_recency(&self) -> Vec<String> {
        self.state.lock().keys_by_recency()
    }
}

impl Default for OrderCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
