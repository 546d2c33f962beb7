//! Producer fan-in.
//!
//! One task per source. Producers never talk to each other; the cache is the
//! only state they share. Each task loops until its cancellation token fires:
//!
//! ```text
//!   generate ─► cache.insert ─► publisher.publish ─► sleep(delay) ─┐
//!       ▲                                                          │
//!       └──────────────────────────────────────────────────────────┘
//! ```

use crate::generator::Generator;
use crate::publisher::Publisher;
use std::sync::Arc;
use telemetry_cache::TelemetryCache;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct IngestionPool {
    producers: Vec<(u32, JoinHandle<u64>)>,
    cancel: CancellationToken,
}

impl IngestionPool {
    /// Spawns producers for source ids `1..=sources`.
    pub fn spawn(
        sources: u32,
        cache: Arc<dyn TelemetryCache>,
        generator: Arc<dyn Generator>,
        publisher: Arc<dyn Publisher>,
        cancel: CancellationToken,
    ) -> Self {
        let producers = (1..=sources)
            .map(|source_id| {
                let handle = tokio::spawn(produce(
                    source_id,
                    cache.clone(),
                    generator.clone(),
                    publisher.clone(),
                    cancel.clone(),
                ));
                (source_id, handle)
            })
            .collect();

        tracing::info!(sources, "started producers");
        Self { producers, cancel }
    }

    /// Signals every producer to stop. In-flight inserts complete normally.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Waits for every producer to finish and returns how many records they
    /// produced in total.
    pub async fn join(self) -> u64 {
        let mut total = 0;
        for (source_id, handle) in self.producers {
            match handle.await {
                Ok(produced) => total += produced,
                Err(e) => tracing::error!(source_id, error = %e, "producer task failed"),
            }
        }
        tracing::info!(total, "all producers stopped");
        total
    }
}

async fn produce(
    source_id: u32,
    cache: Arc<dyn TelemetryCache>,
    generator: Arc<dyn Generator>,
    publisher: Arc<dyn Publisher>,
    cancel: CancellationToken,
) -> u64 {
    let mut produced = 0;

    while !cancel.is_cancelled() {
        let generated = generator.next(source_id);
        cache.insert(generated.record);
        produced += 1;

        // A sink applying backpressure must not outlive a stop signal.
        tokio::select! {
            biased;
            result = publisher.publish(&generated.record) => {
                if let Err(e) = result {
                    tracing::warn!(source_id, error = %e, "failed to publish record");
                }
            }
            _ = cancel.cancelled() => break,
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(generated.delay) => {}
        }
    }

    tracing::debug!(source_id, produced, "producer stopped");
    produced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generated;
    use crate::publisher::{ChannelPublisher, NoopPublisher};
    use std::time::Duration;
    use telemetry_cache::{Record, RecordStore};

    struct FixedGenerator {
        delay: Duration,
    }

    impl Generator for FixedGenerator {
        fn next(&self, source_id: u32) -> Generated {
            Generated {
                record: Record::new(source_id, source_id * 10, 0.0, 0.0),
                delay: self.delay,
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_every_source_produces_until_stopped() {
        let store = Arc::new(RecordStore::new(10_000).unwrap());
        let (publisher, mut rx) = ChannelPublisher::new(10_000);
        let pool = IngestionPool::spawn(
            4,
            store.clone(),
            Arc::new(FixedGenerator {
                delay: Duration::from_millis(1),
            }),
            Arc::new(publisher),
            CancellationToken::new(),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        pool.stop();
        let total = pool.join().await;

        assert!(total >= 4);
        assert_eq!(store.len() as u64, total);

        let mut seen = std::collections::HashSet::new();
        while let Ok(record) = rx.try_recv() {
            seen.insert(record.source_id);
        }
        assert_eq!(seen, (1..=4).collect::<std::collections::HashSet<u32>>());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_long_delay() {
        let store = Arc::new(RecordStore::new(10).unwrap());
        let cancel = CancellationToken::new();
        let pool = IngestionPool::spawn(
            2,
            store.clone(),
            Arc::new(FixedGenerator {
                delay: Duration::from_secs(3600),
            }),
            Arc::new(NoopPublisher),
            cancel.clone(),
        );

        tokio::task::yield_now().await;
        cancel.cancel();
        let total = tokio::time::timeout(Duration::from_secs(5), pool.join())
            .await
            .expect("producers should stop promptly");

        assert!(total <= 2);
        assert_eq!(store.len() as u64, total);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_reaches_producer_blocked_on_full_sink() {
        let store = Arc::new(RecordStore::new(100).unwrap());
        let (publisher, _rx) = ChannelPublisher::new(1);
        let pool = IngestionPool::spawn(
            1,
            store.clone(),
            Arc::new(FixedGenerator {
                delay: Duration::from_millis(1),
            }),
            Arc::new(publisher),
            CancellationToken::new(),
        );

        // The channel holds one record; the producer is now parked in publish.
        tokio::time::sleep(Duration::from_millis(50)).await;
        pool.stop();
        let total = tokio::time::timeout(Duration::from_secs(3), pool.join())
            .await
            .expect("producer blocked on a full sink should stop promptly");

        assert!(total >= 2);
        assert_eq!(store.len() as u64, total);
    }
}
