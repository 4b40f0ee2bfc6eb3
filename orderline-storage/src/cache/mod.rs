//! In-process order cache.
//!
//! A single [`OrderCache`] is shared (behind an `Arc`) by the ingestion
//! pipeline, which writes every persisted order, and by the read path,
//! which backfills on miss. Eviction is by entry count; expiry by age since
//! the last `set`. Neither ever touches the durable store.
//!
//! # Example
//!
//! ```ignore
//! let cache = OrderCache::start(CacheConfig::from_env());
//! cache.load_from_store(Some(store.as_ref())).await?;
//!
//! cache.set(order.order_uid.clone(), order);
//! let hit = cache.get("b563feb7b2b84b6test");
//! ```

pub mod config;
mod lru;
mod order_cache;
mod stats;
mod sweeper;

pub use config::{CacheConfig, DEFAULT_CACHE_MAX_SIZE, DEFAULT_CACHE_TTL_SECS};
pub use order_cache::OrderCache;
pub use stats::CacheStats;
pub use sweeper::spawn_expiry_sweeper;
