//! Shared handler state.

use std::sync::Arc;
use std::time::Instant;

use orderline_ingest::IngestMetrics;
use orderline_storage::{CachedOrderReader, OrderCache, OrderStore};

/// State handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub reader: CachedOrderReader<dyn OrderStore>,
    /// Pipeline counters, when a pipeline runs in this process.
    pub ingest: Option<Arc<IngestMetrics>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(cache: Arc<OrderCache>, store: Arc<dyn OrderStore>) -> Self {
        Self {
            reader: CachedOrderReader::new(cache, store),
            ingest: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_ingest_metrics(mut self, metrics: Arc<IngestMetrics>) -> Self {
        self.ingest = Some(metrics);
        self
    }

    pub fn cache(&self) -> &Arc<OrderCache> {
        self.reader.cache()
    }
}
