//! Ingestion Pipeline
//!
//! Single consume loop that moves each message through
//! decode → validate → persist → cache → acknowledge.
//!
//! # Acknowledgment rules
//!
//! | Outcome | Acknowledged | Cache |
//! |---------|--------------|-------|
//! | malformed payload | yes | untouched |
//! | validation failure | yes | untouched |
//! | persist failure (incl. conflict under `Redeliver`) | **no** | untouched |
//! | conflict under `Acknowledge` | yes | untouched |
//! | stored | yes | `set` with the persisted order |
//!
//! A failed acknowledgment is logged and counted; the stored order stays
//! stored and cached, so a redelivery of the same message is a conflict.

use std::sync::Arc;

use orderline_core::{DecodeError, Order, SourceError, StorageError, ValidationError};
use orderline_storage::{OrderCache, OrderStore};
use orderline_validation::OrderValidator;
use tokio::sync::watch;

use crate::config::{ConflictPolicy, IngestConfig};
use crate::metrics::IngestMetrics;
use crate::source::{MessageSource, RawMessage};

/// Why a message was discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Decode(DecodeError),
    Validation(ValidationError),
}

/// Result of processing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Persisted and cached.
    Stored { order_uid: String, acknowledged: bool },

    /// Discarded as undecodable or invalid.
    Rejected {
        offset: u64,
        reason: RejectReason,
        acknowledged: bool,
    },

    /// Already stored; acknowledged as a replay.
    Duplicate { order_uid: String, acknowledged: bool },

    /// Store write failed; left for redelivery.
    PersistFailed { order_uid: String, error: StorageError },
}

impl MessageOutcome {
    /// Whether the message was committed on the source.
    pub fn is_acknowledged(&self) -> bool {
        match self {
            MessageOutcome::Stored { acknowledged, .. }
            | MessageOutcome::Rejected { acknowledged, .. }
            | MessageOutcome::Duplicate { acknowledged, .. } => *acknowledged,
            MessageOutcome::PersistFailed { .. } => false,
        }
    }
}

/// Consumes a [`MessageSource`] into a store and a shared cache.
pub struct IngestPipeline<Src, St: ?Sized> {
    source: Src,
    store: Arc<St>,
    cache: Arc<OrderCache>,
    validator: OrderValidator,
    config: IngestConfig,
    metrics: Arc<IngestMetrics>,
}

impl<Src, St> IngestPipeline<Src, St>
where
    Src: MessageSource,
    St: OrderStore + ?Sized,
{
    pub fn new(source: Src, store: Arc<St>, cache: Arc<OrderCache>, config: IngestConfig) -> Self {
        Self {
            source,
            store,
            cache,
            validator: OrderValidator::new(),
            config,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Shared handle to the pipeline counters.
    pub fn metrics(&self) -> Arc<IngestMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut Src {
        &mut self.source
    }

    /// Run until shutdown is signalled or the source closes.
    ///
    /// Shutdown is checked before every fetch and raced against the fetch
    /// itself, so a pending wait is abandoned without acknowledging anything.
    /// Dropping the shutdown sender also stops the loop.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) -> Arc<IngestMetrics> {
        tracing::info!(
            fetch_timeout_ms = self.config.fetch_timeout.as_millis() as u64,
            conflict_policy = %self.config.conflict_policy,
            "Ingestion pipeline started"
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let fetched = tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }

                result = self.fetch() => result,
            };

            match fetched {
                Ok(message) => {
                    self.process(message).await;
                }
                Err(SourceError::Timeout) => {}
                Err(SourceError::Closed) => {
                    tracing::info!("Message source closed");
                    break;
                }
                Err(_) => {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => {}
                        _ = tokio::time::sleep(self.config.error_backoff) => {}
                    }
                }
            }
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            fetched = snapshot.fetched,
            stored = snapshot.stored,
            rejected = snapshot.rejected(),
            duplicates = snapshot.duplicates,
            persist_failures = snapshot.persist_failures,
            ack_failures = snapshot.ack_failures,
            fetch_errors = snapshot.fetch_errors,
            "Ingestion pipeline stopped"
        );

        self.metrics
    }

    /// Fetch one message and process it.
    ///
    /// # Errors
    /// Returns the source error when nothing was fetched (timeout included).
    pub async fn poll_once(&mut self) -> Result<MessageOutcome, SourceError> {
        let message = self.fetch().await?;
        Ok(self.process(message).await)
    }

    /// Run one message through decode, validate, persist, cache, acknowledge.
    pub async fn process(&mut self, message: RawMessage) -> MessageOutcome {
        let offset = message.offset;

        let decoded = match serde_json::from_slice::<Option<Order>>(&message.payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                let err = DecodeError::from(e);
                IngestMetrics::incr(&self.metrics.decode_rejected);
                tracing::warn!(offset, error = %err, "Discarding malformed message");
                let acknowledged = self.acknowledge(&message).await;
                return MessageOutcome::Rejected {
                    offset,
                    reason: RejectReason::Decode(err),
                    acknowledged,
                };
            }
        };

        let order = match self.validator.check(decoded) {
            Ok(order) => order,
            Err(err) => {
                IngestMetrics::incr(&self.metrics.validation_rejected);
                tracing::warn!(offset, error = %err, "Discarding invalid order");
                let acknowledged = self.acknowledge(&message).await;
                return MessageOutcome::Rejected {
                    offset,
                    reason: RejectReason::Validation(err),
                    acknowledged,
                };
            }
        };

        let order_uid = order.order_uid.clone();

        match self.store.create(&order).await {
            Ok(()) => {}
            Err(StorageError::Conflict { .. })
                if self.config.conflict_policy == ConflictPolicy::Acknowledge =>
            {
                IngestMetrics::incr(&self.metrics.duplicates);
                tracing::info!(order_uid = %order_uid, offset, "Order already stored; acknowledging replay");
                let acknowledged = self.acknowledge(&message).await;
                return MessageOutcome::Duplicate {
                    order_uid,
                    acknowledged,
                };
            }
            Err(error) => {
                IngestMetrics::incr(&self.metrics.persist_failures);
                tracing::error!(
                    order_uid = %order_uid,
                    offset,
                    error = %error,
                    "Failed to persist order; leaving message unacknowledged"
                );
                return MessageOutcome::PersistFailed { order_uid, error };
            }
        }

        self.cache.set(order_uid.clone(), order);
        IngestMetrics::incr(&self.metrics.stored);

        let acknowledged = self.acknowledge(&message).await;
        tracing::debug!(order_uid = %order_uid, offset, acknowledged, "Order stored");
        MessageOutcome::Stored {
            order_uid,
            acknowledged,
        }
    }

    async fn fetch(&mut self) -> Result<RawMessage, SourceError> {
        match self.source.fetch_next(self.config.fetch_timeout).await {
            Ok(message) => {
                IngestMetrics::incr(&self.metrics.fetched);
                Ok(message)
            }
            Err(SourceError::Timeout) => {
                IngestMetrics::incr(&self.metrics.timeouts);
                tracing::trace!("No message within fetch timeout");
                Err(SourceError::Timeout)
            }
            Err(SourceError::Closed) => Err(SourceError::Closed),
            Err(error) => {
                IngestMetrics::incr(&self.metrics.fetch_errors);
                tracing::warn!(error = %error, "Message fetch failed");
                Err(error)
            }
        }
    }

    async fn acknowledge(&mut self, message: &RawMessage) -> bool {
        match self.source.acknowledge(message).await {
            Ok(()) => true,
            Err(error) => {
                IngestMetrics::incr(&self.metrics.ack_failures);
                tracing::warn!(offset = message.offset, error = %error, "Failed to acknowledge message");
                false
            }
        }
    }
}
