//! Outbound publishing of generated records.
//!
//! Publishing is best effort from the producers' point of view: a failed
//! publish is logged and ingestion carries on.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use telemetry_cache::Record;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publisher is closed")]
    Closed,

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sink error: {0}")]
    Sink(String),
}

/// Push interface to a downstream sink.
#[async_trait]
pub trait Publisher: Send + Sync + 'static {
    async fn publish(&self, record: &Record) -> Result<(), PublishError>;

    /// Flushes and releases the sink. Later publishes fail with `Closed`.
    async fn close(&self) -> Result<(), PublishError>;
}

/// Writes every record as a JSON `tracing` event.
#[derive(Debug)]
pub struct LogPublisher {
    topic: String,
    closed: AtomicBool,
}

impl LogPublisher {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, record: &Record) -> Result<(), PublishError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PublishError::Closed);
        }
        let message = serde_json::to_string(record)?;
        tracing::info!(topic = %self.topic, %message, "produced message");
        Ok(())
    }

    async fn close(&self) -> Result<(), PublishError> {
        self.closed.store(true, Ordering::Release);
        tracing::info!(topic = %self.topic, "publisher closed");
        Ok(())
    }
}

/// Forwards records into a bounded channel.
///
/// Closing drops the sender, so the receiving side sees the end of the
/// stream once it has drained what was already queued.
#[derive(Debug)]
pub struct ChannelPublisher {
    sender: Mutex<Option<mpsc::Sender<Record>>>,
}

impl ChannelPublisher {
    /// `buffer` is clamped to at least one queued record.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Record>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                sender: Mutex::new(Some(tx)),
            },
            rx,
        )
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    async fn publish(&self, record: &Record) -> Result<(), PublishError> {
        let sender = self.sender.lock().await.clone().ok_or(PublishError::Closed)?;
        sender
            .send(*record)
            .await
            .map_err(|_| PublishError::Sink("receiver dropped".to_string()))
    }

    async fn close(&self) -> Result<(), PublishError> {
        self.sender.lock().await.take();
        Ok(())
    }
}

/// Discards every record.
#[derive(Debug, Default)]
pub struct NoopPublisher;

#[async_trait]
impl Publisher for NoopPublisher {
    async fn publish(&self, _record: &Record) -> Result<(), PublishError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), PublishError> {
        Ok(())
    }
}
