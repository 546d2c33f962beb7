//! Startup and ordered shutdown of the whole pipeline.
//!
//! Startup: cache → publisher → generator → query server → producers.
//! Shutdown: stop producers → wait for them → close the publisher → stop
//! the query server. Producers are always gone before the sink is closed.

use crate::config::{PublisherKind, Settings};
use crate::generator::{Generator, RandomWalkGenerator};
use crate::ingest::IngestionPool;
use crate::publisher::{LogPublisher, NoopPublisher, Publisher};
use arrow_flight::flight_service_server::FlightServiceServer;
use std::net::SocketAddr;
use std::sync::Arc;
use telemetry_cache::{RecordStore, TelemetryCache, TelemetryFlightService, TelemetryQuery};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Summary returned by [`RunningService::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub records_produced: u64,
    pub records_retained: usize,
}

pub struct TelematicsService;

impl TelematicsService {
    /// Builds every component from `settings` and starts serving.
    pub async fn start(settings: &Settings) -> Result<RunningService, BoxError> {
        let publisher: Arc<dyn Publisher> = match settings.publisher.kind {
            PublisherKind::Log => Arc::new(LogPublisher::new(settings.publisher.topic.clone())),
            PublisherKind::None => Arc::new(NoopPublisher),
        };
        let generator = Arc::new(RandomWalkGenerator::new(
            settings.ingestion.max_speed,
            settings.ingestion.max_time_step(),
        ));
        Self::start_with(settings, generator, publisher).await
    }

    /// Like [`start`](Self::start) with caller-supplied collaborators.
    pub async fn start_with(
        settings: &Settings,
        generator: Arc<dyn Generator>,
        publisher: Arc<dyn Publisher>,
    ) -> Result<RunningService, BoxError> {
        settings.validate()?;

        tracing::info!(capacity = settings.store.capacity, "initializing data cache");
        let cache = Arc::new(RecordStore::new(settings.store.capacity)?);

        let listener = TcpListener::bind(settings.server_addr()).await?;
        let local_addr = listener.local_addr()?;

        let server_cancel = CancellationToken::new();
        let service = TelemetryFlightService::new(TelemetryQuery::new(cache.clone()));
        let server = {
            let cancel = server_cancel.clone();
            tokio::spawn(async move {
                tracing::info!(address = %local_addr, "starting query server");
                Server::builder()
                    .add_service(FlightServiceServer::new(service))
                    .serve_with_incoming_shutdown(
                        tokio_stream::wrappers::TcpListenerStream::new(listener),
                        async move { cancel.cancelled().await },
                    )
                    .await
            })
        };

        tracing::info!(sources = settings.ingestion.sources, "starting data generation");
        let producers = IngestionPool::spawn(
            settings.ingestion.sources,
            cache.clone(),
            generator,
            publisher.clone(),
            CancellationToken::new(),
        );

        Ok(RunningService {
            cache,
            publisher,
            producers,
            server,
            server_cancel,
            local_addr,
        })
    }
}

/// Handle to a started pipeline.
pub struct RunningService {
    cache: Arc<RecordStore>,
    publisher: Arc<dyn Publisher>,
    producers: IngestionPool,
    server: JoinHandle<Result<(), tonic::transport::Error>>,
    server_cancel: CancellationToken,
    local_addr: SocketAddr,
}

impl RunningService {
    /// Address the query server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn cache(&self) -> Arc<RecordStore> {
        self.cache.clone()
    }

    /// Shuts everything down in order and waits for it to finish.
    pub async fn shutdown(self) -> Result<ShutdownReport, BoxError> {
        tracing::info!("stopping producers");
        self.producers.stop();
        let records_produced = self.producers.join().await;

        tracing::info!("closing publisher");
        if let Err(e) = self.publisher.close().await {
            tracing::warn!(error = %e, "failed to close publisher");
        }

        tracing::info!("stopping query server");
        self.server_cancel.cancel();
        self.server.await??;

        Ok(ShutdownReport {
            records_produced,
            records_retained: self.cache.len(),
        })
    }
}
