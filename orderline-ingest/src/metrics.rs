//! Ingestion counters.
//!
//! Plain atomics shared between the pipeline task and whoever reports on it
//! (the `/stats` endpoint, shutdown logging).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for pipeline activity since startup.
#[derive(Debug, Default)]
pub struct IngestMetrics {
    /// Messages received from the source
    pub fetched: AtomicU64,

    /// Orders persisted and cached
    pub stored: AtomicU64,

    /// Payloads that did not decode
    pub decode_rejected: AtomicU64,

    /// Decoded orders that failed validation
    pub validation_rejected: AtomicU64,

    /// Conflicts acknowledged as replays
    pub duplicates: AtomicU64,

    /// Store writes that failed, message left unacknowledged
    pub persist_failures: AtomicU64,

    /// Acknowledgments the source refused
    pub ack_failures: AtomicU64,

    /// Transport errors other than timeout
    pub fetch_errors: AtomicU64,

    /// Fetches that found nothing within the wait
    pub timeouts: AtomicU64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            fetched: self.fetched.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            decode_rejected: self.decode_rejected.load(Ordering::Relaxed),
            validation_rejected: self.validation_rejected.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            ack_failures: self.ack_failures.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of ingest metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSnapshot {
    pub fetched: u64,
    pub stored: u64,
    pub decode_rejected: u64,
    pub validation_rejected: u64,
    pub duplicates: u64,
    pub persist_failures: u64,
    pub ack_failures: u64,
    pub fetch_errors: u64,
    pub timeouts: u64,
}

impl IngestSnapshot {
    /// Messages that were discarded (decode or validation).
    pub fn rejected(&self) -> u64 {
        self.decode_rejected + self.validation_rejected
    }
}
