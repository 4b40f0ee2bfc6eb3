//! Orderline Storage - Store Contract, Cache, and Read Path
//!
//! Defines the async [`OrderStore`] abstraction, an in-memory implementation,
//! the LRU+TTL [`OrderCache`], and the cache-aside [`CachedOrderReader`].
//! The Postgres store lives in `orderline-api`.

pub mod cache;
pub mod memory;
pub mod read_through;
pub mod store;

pub use cache::{spawn_expiry_sweeper, CacheConfig, CacheStats, OrderCache};
pub use memory::InMemoryOrderStore;
pub use read_through::{CachedOrderReader, LookupError, LookupSource, OrderRead};
pub use store::OrderStore;
