//! Ingestion configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use orderline_core::ConfigError;

/// Default bounded wait for one fetch.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

/// Default pause after a transport error.
pub const DEFAULT_SOURCE_ERROR_BACKOFF_MS: u64 = 1000;

/// What the pipeline does when an order id is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Leave the message unacknowledged so the transport redelivers it.
    #[default]
    Redeliver,
    /// Treat the message as an idempotent replay and acknowledge it.
    Acknowledge,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::Redeliver => "redeliver",
            ConflictPolicy::Acknowledge => "acknowledge",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redeliver" => Ok(ConflictPolicy::Redeliver),
            "acknowledge" | "ack" => Ok(ConflictPolicy::Acknowledge),
            _ => Err(ConfigError::InvalidValue {
                field: "ORDERLINE_CONFLICT_POLICY".to_string(),
                value: s.to_string(),
                reason: "expected 'redeliver' or 'acknowledge'".to_string(),
            }),
        }
    }
}

/// Configuration for [`crate::IngestPipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Bounded wait for one fetch (default: 5 seconds)
    pub fetch_timeout: Duration,

    /// Pause after a transport error other than timeout (default: 1 second)
    pub error_backoff: Duration,

    /// Handling of duplicate order ids (default: redeliver)
    pub conflict_policy: ConflictPolicy,

    /// JSON-lines input file. `None` reads standard input.
    pub source_path: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            error_backoff: Duration::from_millis(DEFAULT_SOURCE_ERROR_BACKOFF_MS),
            conflict_policy: ConflictPolicy::default(),
            source_path: None,
        }
    }
}

impl IngestConfig {
    /// Create IngestConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `ORDERLINE_FETCH_TIMEOUT_SECS`: Fetch wait in seconds (default: 5)
    /// - `ORDERLINE_SOURCE_ERROR_BACKOFF_MS`: Backoff after transport errors (default: 1000)
    /// - `ORDERLINE_CONFLICT_POLICY`: `redeliver` or `acknowledge` (default: redeliver)
    /// - `ORDERLINE_SOURCE_PATH`: JSON-lines input file (default: stdin)
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for an unknown conflict policy.
    pub fn from_env() -> Result<Self, ConfigError> {
        let fetch_timeout = Duration::from_secs(
            std::env::var("ORDERLINE_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
        );

        let error_backoff = Duration::from_millis(
            std::env::var("ORDERLINE_SOURCE_ERROR_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SOURCE_ERROR_BACKOFF_MS),
        );

        let conflict_policy = match std::env::var("ORDERLINE_CONFLICT_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => ConflictPolicy::default(),
        };

        let source_path = std::env::var("ORDERLINE_SOURCE_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            fetch_timeout,
            error_backoff,
            conflict_policy,
            source_path,
        })
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }
}
