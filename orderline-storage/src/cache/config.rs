//! Cache configuration.

use std::time::Duration;

/// Default maximum number of cached orders.
pub const DEFAULT_CACHE_MAX_SIZE: usize = 1000;

/// Default entry time-to-live in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Configuration for [`super::OrderCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries (not bytes). Values below 1 are raised to 1.
    pub max_entries: usize,
    /// Entry lifetime. `None` disables time-based expiry and the sweeper.
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_SIZE,
            ttl: Some(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create CacheConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `ORDERLINE_CACHE_MAX_SIZE`: Maximum cached orders (default: 1000)
    /// - `ORDERLINE_CACHE_TTL_SECS`: Entry TTL in seconds, 0 disables expiry (default: 3600)
    pub fn from_env() -> Self {
        let max_entries = std::env::var("ORDERLINE_CACHE_MAX_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CACHE_MAX_SIZE);

        let ttl_secs: u64 = std::env::var("ORDERLINE_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);

        Self::default()
            .with_max_entries(max_entries)
            .with_ttl(Duration::from_secs(ttl_secs))
    }

    /// Set the maximum number of entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set the entry TTL. A zero duration disables expiry.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = (!ttl.is_zero()).then_some(ttl);
        self
    }

    /// Disable time-based expiry.
    pub fn without_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Period of the background sweep: half the TTL, at least 1 ms.
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.ttl
            .map(|ttl| (ttl / 2).max(Duration::from_millis(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.ttl, Some(Duration::from_secs(3600)));
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new()
            .with_max_entries(5)
            .with_ttl(Duration::from_secs(10));
        assert_eq!(config.max_entries, 5);
        assert_eq!(config.ttl, Some(Duration::from_secs(10)));
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = CacheConfig::new().with_ttl(Duration::ZERO);
        assert_eq!(config.ttl, None);
        assert_eq!(config.sweep_interval(), None);
    }

    #[test]
    fn test_sweep_interval_floor() {
        let config = CacheConfig::new().with_ttl(Duration::from_nanos(1));
        assert_eq!(config.sweep_interval(), Some(Duration::from_millis(1)));
    }
}
