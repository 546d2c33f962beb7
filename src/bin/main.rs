//! Telematics generator binary.
//!
//! Simulates a fleet of sources, keeps the most recent records in a bounded
//! in-memory cache and serves that cache over Arrow Flight.
//!
//! # Configuration
//!
//! In order of precedence:
//!
//! 1. Command-line arguments (highest precedence)
//! 2. Environment variables (prefixed with `TELEMATICS_`)
//! 3. User-specified configuration file (via `--config`)
//! 4. System-wide configuration (`/etc/telematics-generator/config.toml`)
//! 5. Default configuration (embedded in binary)
//!
//! ## Command-line Options
//!
//! ```text
//! Options:
//!   -c, --config <FILE>            Path to configuration file
//!       --host <HOST>              Query server host [env: TELEMATICS_SERVER_HOST]
//!       --port <PORT>              Query server port [env: TELEMATICS_SERVER_PORT]
//!       --cache-size <N>           Records retained in memory [env: TELEMATICS_CACHE_SIZE]
//!       --sources <N>              Number of simulated sources [env: TELEMATICS_SOURCES]
//!       --max-speed <KMH>          Speed upper bound [env: TELEMATICS_MAX_SPEED]
//!       --max-time-step <SECS>     Delay upper bound [env: TELEMATICS_MAX_TIME_STEP]
//!       --publisher <KIND>         "log" or "none" [env: TELEMATICS_PUBLISHER_KIND]
//!       --log <FILTER>             Log filter [env: TELEMATICS_LOG]
//! ```
//!
//! # Examples
//!
//! ```bash
//! # Run with defaults
//! telematics-generator
//!
//! # Fifty sources, a small window, no downstream publishing
//! telematics-generator --sources 50 --cache-size 200 --publisher none
//! ```

use clap::Parser;
use telematics_generator::{
    config::{CliArgs, Settings},
    service::TelematicsService,
    telemetry::init_tracing,
};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli_args = CliArgs::parse();
    let settings = Settings::new(cli_args)?;

    init_tracing(&settings.logging.filter);
    info!(
        address = %settings.server_addr(),
        capacity = settings.store.capacity,
        sources = settings.ingestion.sources,
        "configuration loaded"
    );

    let running = TelematicsService::start(&settings).await?;
    info!(address = %running.local_addr(), "service running");

    shutdown_signal().await;
    info!("shutdown signal received, initiating graceful shutdown");

    let report = running.shutdown().await?;
    info!(
        produced = report.records_produced,
        retained = report.records_retained,
        "shutdown complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async { received_or_park(signal::ctrl_c().await, "Ctrl+C").await };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C"),
        () = terminate => info!("received SIGTERM"),
    }
}

/// Resolves once a handler reported delivery. A handler that failed to
/// install never resolves, so it cannot trigger a shutdown on its own.
async fn received_or_park(result: std::io::Result<()>, handler: &str) {
    if let Err(e) = result {
        error!(error = %e, handler, "failed to install signal handler");
        std::future::pending::<()>().await;
    }
}
