#[cfg(test)]
mod tests {
    use crate::config::Settings;
    use crate::generator::{Generated, Generator};
    use crate::publisher::{ChannelPublisher, PublishError, Publisher};
    use crate::service::TelematicsService;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use futures::TryStreamExt;
    use mockall::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use telemetry_cache::{Record, TelemetryCache, TelemetryClient};

    mock! {
        pub Generator {}
        impl Generator for Generator {
            fn next(&self, source_id: u32) -> Generated;
        }
    }

    mock! {
        pub Publisher {}
        #[async_trait]
        impl Publisher for Publisher {
            async fn publish(&self, record: &Record) -> Result<(), PublishError>;
            async fn close(&self) -> Result<(), PublishError>;
        }
    }

    fn test_settings(sources: u32, capacity: usize) -> Settings {
        let mut settings = Settings::default();
        settings.server.port = 0;
        settings.store.capacity = capacity;
        settings.ingestion.sources = sources;
        settings
    }

    fn paced_generator(delay: Duration) -> MockGenerator {
        let mut generator = MockGenerator::new();
        generator.expect_next().returning(move |source_id| Generated {
            record: Record::new(source_id, 10 * source_id, 50.4500, 30.5233),
            delay,
        });
        generator
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_publish_failure_does_not_stop_ingestion() {
        let mut publisher = MockPublisher::new();
        let attempts = Arc::new(AtomicU64::new(0));
        let counter = attempts.clone();
        publisher.expect_publish().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PublishError::Sink("broker unavailable".to_string()))
        });
        publisher.expect_close().times(1).returning(|| Ok(()));

        let running = TelematicsService::start_with(
            &test_settings(3, 10_000),
            Arc::new(paced_generator(Duration::from_millis(1))),
            Arc::new(publisher),
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let cache = running.cache();
        let report = running.shutdown().await.unwrap();

        assert!(report.records_produced > 3);
        assert_eq!(report.records_retained as u64, report.records_produced);
        assert_eq!(attempts.load(Ordering::SeqCst), report.records_produced);
        assert_eq!(cache.len() as u64, report.records_produced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_closes_publisher_after_producers_stop() {
        let closed = Arc::new(AtomicBool::new(false));
        let published_after_close = Arc::new(AtomicBool::new(false));

        let mut publisher = MockPublisher::new();
        let closed_on_publish = closed.clone();
        let violation = published_after_close.clone();
        publisher.expect_publish().returning(move |_| {
            if closed_on_publish.load(Ordering::SeqCst) {
                violation.store(true, Ordering::SeqCst);
            }
            Ok(())
        });
        let closed_on_close = closed.clone();
        publisher.expect_close().times(1).returning(move || {
            closed_on_close.store(true, Ordering::SeqCst);
            Ok(())
        });

        let running = TelematicsService::start_with(
            &test_settings(8, 100),
            Arc::new(paced_generator(Duration::from_millis(1))),
            Arc::new(publisher),
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let report = running.shutdown().await.unwrap();

        assert!(closed.load(Ordering::SeqCst));
        assert!(!published_after_close.load(Ordering::SeqCst));
        assert!(report.records_retained <= 100);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_queries_served_while_ingesting() {
        let mut publisher = MockPublisher::new();
        publisher.expect_publish().returning(|_| Ok(()));
        publisher.expect_close().returning(|| Ok(()));

        let running = TelematicsService::start_with(
            &test_settings(2, 50),
            Arc::new(paced_generator(Duration::from_millis(5))),
            Arc::new(publisher),
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        let url = format!("http://{}", running.local_addr());
        let mut client = TelemetryClient::connect(url).await.unwrap();

        let latest = client.latest().await.unwrap();
        assert!(latest.source_id == 1 || latest.source_id == 2);
        assert_eq!(latest.speed, 10 * latest.source_id);

        let now = Utc::now();
        let records: Vec<Record> = client
            .range(now - ChronoDuration::minutes(1), now + ChronoDuration::minutes(1))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert!(!records.is_empty());
        assert!(records.len() <= 50);

        running.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_completes_with_undrained_sink() {
        let (publisher, _rx) = ChannelPublisher::new(1);

        let running = TelematicsService::start_with(
            &test_settings(4, 100),
            Arc::new(paced_generator(Duration::from_millis(1))),
            Arc::new(publisher),
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let report = tokio::time::timeout(Duration::from_secs(5), running.shutdown())
            .await
            .expect("shutdown should not wait on a full sink")
            .unwrap();

        assert!(report.records_produced >= 4);
        assert!(report.records_retained <= 100);
    }
}
