//! In-process message source over a tokio mpsc channel.
//!
//! Offsets are assigned at publish time. Fetched messages stay in flight
//! until acknowledged; [`ChannelSource::requeue_unacknowledged`] makes them
//! eligible for delivery again, the way a broker redelivers uncommitted
//! records after a consumer restart.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orderline_core::SourceError;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::source::{MessageSource, RawMessage};

/// Shared record of acknowledged offsets, in acknowledgment order.
#[derive(Debug, Clone, Default)]
pub struct AckLog {
    offsets: Arc<Mutex<Vec<u64>>>,
}

impl AckLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, offset: u64) {
        self.offsets.lock().push(offset);
    }

    /// Acknowledged offsets so far.
    pub fn offsets(&self) -> Vec<u64> {
        self.offsets.lock().clone()
    }

    pub fn contains(&self, offset: u64) -> bool {
        self.offsets.lock().contains(&offset)
    }

    pub fn len(&self) -> usize {
        self.offsets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Create a bounded channel source and its publisher.
pub fn channel(capacity: usize) -> (ChannelPublisher, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let publisher = ChannelPublisher {
        tx,
        next_offset: Arc::new(AtomicU64::new(0)),
    };
    let source = ChannelSource {
        rx,
        in_flight: BTreeMap::new(),
        redeliver: VecDeque::new(),
        acks: AckLog::new(),
    };
    (publisher, source)
}

/// Producer side. Cloneable; the source reports `Closed` once every clone is
/// dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<RawMessage>,
    next_offset: Arc<AtomicU64>,
}

impl ChannelPublisher {
    /// Publish raw bytes. Returns the assigned offset.
    pub async fn publish(&self, payload: impl Into<Vec<u8>>) -> Result<u64, SourceError> {
        let offset = self.next_offset.fetch_add(1, Ordering::Relaxed);
        self.tx
            .send(RawMessage::new(offset, payload))
            .await
            .map_err(|_| SourceError::Closed)?;
        Ok(offset)
    }

    /// Publish a value as a JSON payload.
    pub async fn publish_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<u64, SourceError> {
        let payload = serde_json::to_vec(value).map_err(|e| SourceError::Transport {
            reason: e.to_string(),
        })?;
        self.publish(payload).await
    }
}

/// Consumer side of [`channel`].
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<RawMessage>,
    in_flight: BTreeMap<u64, RawMessage>,
    redeliver: VecDeque<RawMessage>,
    acks: AckLog,
}

impl ChannelSource {
    /// Handle to the acknowledgment record, usable after the source is moved.
    pub fn ack_log(&self) -> AckLog {
        self.acks.clone()
    }

    /// Number of fetched but unacknowledged messages.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Queue every in-flight message for redelivery, lowest offset first.
    /// Returns the number requeued.
    pub fn requeue_unacknowledged(&mut self) -> usize {
        let pending = std::mem::take(&mut self.in_flight);
        let count = pending.len();
        self.redeliver.extend(pending.into_values());
        count
    }

    fn track(&mut self, message: RawMessage) -> RawMessage {
        self.in_flight.insert(message.offset, message.clone());
        message
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn fetch_next(&mut self, timeout: Duration) -> Result<RawMessage, SourceError> {
        if let Some(message) = self.redeliver.pop_front() {
            return Ok(self.track(message));
        }

        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(message)) => Ok(self.track(message)),
            Ok(None) => Err(SourceError::Closed),
            Err(_) => Err(SourceError::Timeout),
        }
    }

    async fn acknowledge(&mut self, message: &RawMessage) -> Result<(), SourceError> {
        if self.in_flight.remove(&message.offset).is_none() {
            return Err(SourceError::Transport {
                reason: format!("offset {} is not in flight", message.offset),
            });
        }
        self.acks.record(message.offset);
        Ok(())
    }
}
