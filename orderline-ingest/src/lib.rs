//! Orderline Ingest - Message Consumption into Store and Cache
//!
//! The [`IngestPipeline`] pulls raw messages from a [`MessageSource`],
//! validates them, persists them through an `OrderStore`, writes them into
//! the shared `OrderCache`, and only then acknowledges them.
//!
//! Two sources are provided: an in-process [`channel`] (tests, embedding)
//! and [`JsonLinesSource`] (stdin or a file).
//!
//! # Example
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let pipeline = IngestPipeline::new(source, store, cache, IngestConfig::from_env()?);
//! let handle = tokio::spawn(pipeline.run(shutdown_rx));
//!
//! // Later, trigger shutdown
//! let _ = shutdown_tx.send(true);
//! let metrics = handle.await?;
//! ```

pub mod channel;
pub mod config;
pub mod lines;
pub mod metrics;
pub mod pipeline;
pub mod source;

pub use channel::{channel, AckLog, ChannelPublisher, ChannelSource};
pub use config::{ConflictPolicy, IngestConfig};
pub use lines::{JsonLinesSource, ThreadedReader};
pub use metrics::{IngestMetrics, IngestSnapshot};
pub use pipeline::{IngestPipeline, MessageOutcome, RejectReason};
pub use source::{MessageSource, RawMessage};
