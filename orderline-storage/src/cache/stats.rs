use serde::Serialize;

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired hits included.
    pub misses: u64,
    /// Number of `set` calls and warm-load inserts.
    pub inserts: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
    /// Number of entries dropped for age, lazily or by the sweeper.
    pub expirations: u64,
    /// Number of entries currently in cache.
    pub entries: u64,
    /// Configured maximum number of entries.
    pub capacity: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
