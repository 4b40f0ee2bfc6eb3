//! End-to-end ingestion tests against in-memory stores and sources.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orderline_core::{DecodeError, SourceError, StorageError, ValidationError};
use orderline_ingest::{
    channel, ChannelSource, ConflictPolicy, IngestConfig, IngestPipeline, JsonLinesSource,
    MessageOutcome, MessageSource, RawMessage, RejectReason,
};
use orderline_storage::{CacheConfig, OrderCache};
use orderline_test_utils::fixtures::{order_payload, valid_order};
use orderline_test_utils::{CountingStore, OrderGenerator, ScriptedStore};
use tokio::io::BufReader;
use tokio::sync::watch;

fn config() -> IngestConfig {
    IngestConfig::default()
        .with_fetch_timeout(Duration::from_millis(50))
        .with_error_backoff(Duration::from_millis(10))
}

fn cache() -> Arc<OrderCache> {
    Arc::new(OrderCache::new(CacheConfig::new().without_ttl()))
}

/// Delivers normally but every commit fails.
struct AckRefusingSource(ChannelSource);

#[async_trait]
impl MessageSource for AckRefusingSource {
    async fn fetch_next(&mut self, timeout: Duration) -> Result<RawMessage, SourceError> {
        self.0.fetch_next(timeout).await
    }

    async fn acknowledge(&mut self, _message: &RawMessage) -> Result<(), SourceError> {
        Err(SourceError::Transport {
            reason: "commit rejected".to_string(),
        })
    }
}

/// Fails the first `failures` fetches with a transport error.
struct FlakySource {
    failures: usize,
    inner: ChannelSource,
}

#[async_trait]
impl MessageSource for FlakySource {
    async fn fetch_next(&mut self, timeout: Duration) -> Result<RawMessage, SourceError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(SourceError::Transport {
                reason: "connection reset".to_string(),
            });
        }
        self.inner.fetch_next(timeout).await
    }

    async fn acknowledge(&mut self, message: &RawMessage) -> Result<(), SourceError> {
        self.inner.acknowledge(message).await
    }
}

// ============================================================================
// SINGLE-MESSAGE OUTCOMES
// ============================================================================

#[tokio::test]
async fn test_stored_order_is_cached_and_acknowledged() {
    let (publisher, source) = channel(8);
    let acks = source.ack_log();
    let store = Arc::new(CountingStore::new());
    let cache = cache();
    let mut pipeline = IngestPipeline::new(source, Arc::clone(&store), Arc::clone(&cache), config());

    let mut order = valid_order("order-00001");
    order.payment.currency = "rub".to_string();
    let offset = publisher.publish(order_payload(&order)).await.unwrap();

    let outcome = pipeline.poll_once().await.unwrap();
    assert_eq!(
        outcome,
        MessageOutcome::Stored {
            order_uid: "order-00001".to_string(),
            acknowledged: true,
        }
    );

    let cached = cache.get("order-00001").expect("order should be cached");
    assert_eq!(cached.payment.currency, "RUB");
    assert!(store.inner().contains("order-00001"));
    assert_eq!(store.counts().creates, 1);
    assert!(acks.contains(offset));
    assert_eq!(pipeline.source().in_flight(), 0);
}

#[tokio::test]
async fn test_malformed_payload_is_acknowledged_and_dropped() {
    let (publisher, source) = channel(8);
    let acks = source.ack_log();
    let store = Arc::new(CountingStore::new());
    let cache = cache();
    let mut pipeline = IngestPipeline::new(source, Arc::clone(&store), Arc::clone(&cache), config());

    let offset = publisher.publish(b"{\"order_uid\": ".to_vec()).await.unwrap();

    let outcome = pipeline.poll_once().await.unwrap();
    assert!(matches!(
        outcome,
        MessageOutcome::Rejected {
            reason: RejectReason::Decode(DecodeError::Malformed { .. }),
            acknowledged: true,
            ..
        }
    ));
    assert!(acks.contains(offset));
    assert_eq!(store.counts().creates, 0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_invalid_order_is_acknowledged_and_dropped() {
    let (publisher, source) = channel(8);
    let acks = source.ack_log();
    let store = Arc::new(CountingStore::new());
    let cache = cache();
    let mut pipeline = IngestPipeline::new(source, Arc::clone(&store), Arc::clone(&cache), config());

    let mut order = valid_order("order-00001");
    order.items[0].sale = 150;
    let offset = publisher.publish(order_payload(&order)).await.unwrap();

    match pipeline.poll_once().await.unwrap() {
        MessageOutcome::Rejected {
            reason: RejectReason::Validation(err),
            acknowledged,
            ..
        } => {
            assert!(acknowledged);
            assert!(matches!(
                err,
                ValidationError::InvalidItem { index: 0, field: "sale", .. }
            ));
        }
        other => panic!("expected validation rejection, got {other:?}"),
    }
    assert!(acks.contains(offset));
    assert_eq!(store.counts().creates, 0);
    assert!(cache.get("order-00001").is_none());
}

#[tokio::test]
async fn test_null_payload_is_missing_order() {
    let (publisher, source) = channel(8);
    let mut pipeline = IngestPipeline::new(source, Arc::new(CountingStore::new()), cache(), config());

    publisher.publish(b"null".to_vec()).await.unwrap();

    let outcome = pipeline.poll_once().await.unwrap();
    assert!(matches!(
        outcome,
        MessageOutcome::Rejected {
            reason: RejectReason::Validation(ValidationError::MissingOrder),
            acknowledged: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_store_failure_leaves_message_unacknowledged() {
    let (publisher, source) = channel(8);
    let acks = source.ack_log();
    let store = Arc::new(ScriptedStore::new());
    store.fail_next_create(StorageError::Unavailable {
        reason: "connection refused".to_string(),
    });
    let cache = cache();
    let mut pipeline = IngestPipeline::new(source, Arc::clone(&store), Arc::clone(&cache), config());

    let offset = publisher
        .publish(order_payload(&valid_order("order-00001")))
        .await
        .unwrap();

    let outcome = pipeline.poll_once().await.unwrap();
    assert!(matches!(
        outcome,
        MessageOutcome::PersistFailed {
            error: StorageError::Unavailable { .. },
            ..
        }
    ));
    assert!(!outcome.is_acknowledged());
    assert!(!acks.contains(offset));
    assert!(cache.get("order-00001").is_none());
    assert_eq!(pipeline.source().in_flight(), 1);

    // Redelivery succeeds once the store recovers.
    assert_eq!(pipeline.source_mut().requeue_unacknowledged(), 1);
    let retried = pipeline.poll_once().await.unwrap();
    assert!(matches!(retried, MessageOutcome::Stored { acknowledged: true, .. }));
    assert!(acks.contains(offset));
    assert!(cache.get("order-00001").is_some());
    assert_eq!(pipeline.metrics().snapshot().persist_failures, 1);
}

// ============================================================================
// CONFLICT POLICY
// ============================================================================

#[tokio::test]
async fn test_conflict_is_not_acknowledged_under_redeliver() {
    let (publisher, source) = channel(8);
    let acks = source.ack_log();
    let existing = valid_order("order-00001");
    let store = Arc::new(CountingStore::with_orders(vec![existing.clone()]));
    let cache = cache();
    let mut pipeline = IngestPipeline::new(source, store, Arc::clone(&cache), config());

    let offset = publisher.publish(order_payload(&existing)).await.unwrap();

    let outcome = pipeline.poll_once().await.unwrap();
    assert!(matches!(
        outcome,
        MessageOutcome::PersistFailed {
            error: StorageError::Conflict { .. },
            ..
        }
    ));
    assert!(!acks.contains(offset));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_conflict_is_acknowledged_as_duplicate() {
    let (publisher, source) = channel(8);
    let acks = source.ack_log();
    let existing = valid_order("order-00001");
    let store = Arc::new(CountingStore::with_orders(vec![existing.clone()]));
    let cache = cache();
    let mut pipeline = IngestPipeline::new(
        source,
        store,
        Arc::clone(&cache),
        config().with_conflict_policy(ConflictPolicy::Acknowledge),
    );

    let offset = publisher.publish(order_payload(&existing)).await.unwrap();

    let outcome = pipeline.poll_once().await.unwrap();
    assert_eq!(
        outcome,
        MessageOutcome::Duplicate {
            order_uid: "order-00001".to_string(),
            acknowledged: true,
        }
    );
    assert!(acks.contains(offset));
    assert!(cache.is_empty());
    assert_eq!(pipeline.metrics().snapshot().duplicates, 1);
}

#[tokio::test]
async fn test_failed_acknowledgment_keeps_order_stored_and_cached() {
    let (publisher, source) = channel(8);
    let store = Arc::new(CountingStore::new());
    let cache = cache();
    let mut pipeline = IngestPipeline::new(
        AckRefusingSource(source),
        Arc::clone(&store),
        Arc::clone(&cache),
        config().with_conflict_policy(ConflictPolicy::Acknowledge),
    );

    publisher
        .publish(order_payload(&valid_order("order-00001")))
        .await
        .unwrap();

    let outcome = pipeline.poll_once().await.unwrap();
    assert_eq!(
        outcome,
        MessageOutcome::Stored {
            order_uid: "order-00001".to_string(),
            acknowledged: false,
        }
    );
    assert!(store.inner().contains("order-00001"));
    assert!(cache.get("order-00001").is_some());

    let snapshot = pipeline.metrics().snapshot();
    assert_eq!(snapshot.stored, 1);
    assert_eq!(snapshot.ack_failures, 1);

    // The uncommitted message comes back and replays as a duplicate.
    assert_eq!(pipeline.source_mut().0.requeue_unacknowledged(), 1);
    let outcome = pipeline.poll_once().await.unwrap();
    assert_eq!(
        outcome,
        MessageOutcome::Duplicate {
            order_uid: "order-00001".to_string(),
            acknowledged: false,
        }
    );
    assert_eq!(store.counts().creates, 2);
    assert_eq!(store.inner().len(), 1);
    assert_eq!(pipeline.metrics().snapshot().ack_failures, 2);
}

// ============================================================================
// RUN LOOP
// ============================================================================

#[tokio::test]
async fn test_run_backs_off_after_fetch_errors_and_continues() {
    let (publisher, source) = channel(8);
    let store = Arc::new(CountingStore::new());
    let cache = cache();
    let flaky = FlakySource {
        failures: 2,
        inner: source,
    };
    let pipeline = IngestPipeline::new(flaky, Arc::clone(&store), Arc::clone(&cache), config());

    publisher
        .publish(order_payload(&valid_order("order-00001")))
        .await
        .unwrap();
    drop(publisher);

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = tokio::time::timeout(Duration::from_secs(5), pipeline.run(shutdown_rx))
        .await
        .expect("pipeline should recover and stop when the source closes");

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.fetch_errors, 2);
    assert_eq!(snapshot.fetched, 1);
    assert_eq!(snapshot.stored, 1);
    assert!(cache.get("order-00001").is_some());
}

#[tokio::test]
async fn test_run_drains_source_until_closed() {
    let (publisher, source) = channel(16);
    let acks = source.ack_log();
    let store = Arc::new(CountingStore::new());
    let cache = cache();
    let pipeline = IngestPipeline::new(source, Arc::clone(&store), Arc::clone(&cache), config());

    let mut generator = OrderGenerator::seeded(5);
    let orders = generator.orders(3);
    for order in &orders {
        publisher.publish_json(order).await.unwrap();
    }
    publisher.publish(b"not json".to_vec()).await.unwrap();
    publisher.publish_json(&generator.invalid_order()).await.unwrap();
    drop(publisher);

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = tokio::time::timeout(Duration::from_secs(5), pipeline.run(shutdown_rx))
        .await
        .expect("pipeline should stop when the source closes");

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.fetched, 5);
    assert_eq!(snapshot.stored, 3);
    assert_eq!(snapshot.decode_rejected, 1);
    assert_eq!(snapshot.validation_rejected, 1);
    assert_eq!(snapshot.persist_failures, 0);
    assert_eq!(acks.len(), 5);

    for order in &orders {
        assert!(cache.get(&order.order_uid).is_some());
        assert!(store.inner().contains(&order.order_uid));
    }
}

#[tokio::test]
async fn test_run_stops_on_shutdown_signal() {
    let (publisher, source) = channel(8);
    let pipeline = IngestPipeline::new(source, Arc::new(CountingStore::new()), cache(), config());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(pipeline.run(shutdown_rx));

    publisher
        .publish(order_payload(&valid_order("order-00001")))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    shutdown_tx.send(true).unwrap();
    let metrics = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("pipeline should stop on shutdown")
        .unwrap();

    assert_eq!(metrics.snapshot().stored, 1);
    // The publisher is still alive, so the loop ended on the signal.
    drop(publisher);
}

#[tokio::test]
async fn test_run_returns_immediately_when_already_shut_down() {
    let (_publisher, source) = channel(8);
    let store = Arc::new(CountingStore::new());
    let pipeline = IngestPipeline::new(source, Arc::clone(&store), cache(), config());

    let (_shutdown_tx, shutdown_rx) = watch::channel(true);
    let metrics = pipeline.run(shutdown_rx).await;

    assert_eq!(metrics.snapshot().fetched, 0);
    assert_eq!(store.counts().creates, 0);
}

#[tokio::test]
async fn test_non_utf8_line_is_rejected_as_malformed() {
    let mut input = b"\xff\xfe\n".to_vec();
    input.extend_from_slice(&order_payload(&valid_order("order-00001")));
    input.push(b'\n');

    let source = JsonLinesSource::new(BufReader::new(Cursor::new(input)));
    let mut pipeline = IngestPipeline::new(source, Arc::new(CountingStore::new()), cache(), config());

    let outcome = pipeline.poll_once().await.unwrap();
    assert!(matches!(
        outcome,
        MessageOutcome::Rejected {
            offset: 1,
            reason: RejectReason::Decode(_),
            acknowledged: true,
        }
    ));
    assert_eq!(pipeline.source().committed_offset(), Some(1));

    let outcome = pipeline.poll_once().await.unwrap();
    assert!(outcome.is_acknowledged());
    assert_eq!(pipeline.source().committed_offset(), Some(2));

    let snapshot = pipeline.metrics().snapshot();
    assert_eq!(snapshot.decode_rejected, 1);
    assert_eq!(snapshot.fetch_errors, 0);
}

#[tokio::test]
async fn test_json_lines_end_to_end() {
    let mut generator = OrderGenerator::seeded(9);
    let orders = generator.orders(2);

    let mut input = String::new();
    for order in &orders {
        input.push_str(&serde_json::to_string(order).unwrap());
        input.push('\n');
    }
    input.push('\n');
    input.push_str("{broken\n");

    let source = JsonLinesSource::new(BufReader::new(Cursor::new(input.into_bytes())));
    let store = Arc::new(CountingStore::new());
    let cache = cache();
    let pipeline = IngestPipeline::new(source, Arc::clone(&store), Arc::clone(&cache), config());

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = pipeline.run(shutdown_rx).await;

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.stored, 2);
    assert_eq!(snapshot.decode_rejected, 1);
    assert_eq!(store.inner().len(), 2);
    for order in &orders {
        assert!(cache.get(&order.order_uid).is_some());
    }
}
