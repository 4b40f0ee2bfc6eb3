//! Message source contract.

use std::time::Duration;

use async_trait::async_trait;
use orderline_core::SourceError;

/// One undecoded record from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Transport position, used for acknowledgment.
    pub offset: u64,
    pub payload: Vec<u8>,
}

impl RawMessage {
    pub fn new(offset: u64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            payload: payload.into(),
        }
    }
}

/// A stream of order records with explicit acknowledgment.
///
/// A message that is fetched but never acknowledged is eligible for
/// redelivery by the transport. Delivery is at-least-once.
#[async_trait]
pub trait MessageSource: Send {
    /// Wait up to `timeout` for the next message.
    ///
    /// # Errors
    /// - `SourceError::Timeout` when nothing arrived in time. Not a failure.
    /// - `SourceError::Closed` when the stream has ended.
    /// - `SourceError::Transport` for anything else.
    async fn fetch_next(&mut self, timeout: Duration) -> Result<RawMessage, SourceError>;

    /// Commit a previously fetched message.
    async fn acknowledge(&mut self, message: &RawMessage) -> Result<(), SourceError>;
}

#[async_trait]
impl<S: MessageSource + ?Sized> MessageSource for Box<S> {
    async fn fetch_next(&mut self, timeout: Duration) -> Result<RawMessage, SourceError> {
        (**self).fetch_next(timeout).await
    }

    async fn acknowledge(&mut self, message: &RawMessage) -> Result<(), SourceError> {
        (**self).acknowledge(message).await
    }
}
