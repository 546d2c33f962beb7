//! Telematics generator: simulated multi-source telemetry with a live,
//! queryable recent-data window.
//!
//! Every source runs its own producer task that generates a record, inserts
//! it into a shared [`RecordStore`](telemetry_cache::RecordStore), hands it
//! to a [`Publisher`] and sleeps for a data-dependent delay. The store is
//! served read-only over Arrow Flight.
//!
//! # Example
//!
//! ```rust,no_run
//! use telematics_generator::{config::Settings, service::TelematicsService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut settings = Settings::default();
//!     settings.store.capacity = 500;
//!     settings.ingestion.sources = 3;
//!
//!     let running = TelematicsService::start(&settings).await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!
//!     let report = running.shutdown().await?;
//!     println!("produced {} records", report.records_produced);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod generator;
pub mod ingest;
pub mod publisher;
pub mod service;
pub mod telemetry;
pub mod tests;

pub use config::Settings;
pub use generator::{Generated, Generator, RandomWalkGenerator};
pub use ingest::IngestionPool;
pub use publisher::{ChannelPublisher, LogPublisher, NoopPublisher, PublishError, Publisher};
pub use service::{RunningService, ShutdownReport, TelematicsService};
