//! Configuration management for the telematics generator.
//!
//! Options are loaded from, in increasing order of precedence:
//! 1. Default configuration (embedded in binary)
//! 2. System-wide configuration file (`/etc/telematics-generator/config.toml`)
//! 3. User-specified configuration file (`--config`)
//! 4. Environment variables prefixed with `TELEMATICS_`, nested keys separated
//!    by `__` (e.g. `TELEMATICS_STORE__CAPACITY=500`)
//! 5. Command-line arguments

use clap::Parser;
use config::{Config, ConfigError};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");
const DEFAULT_CONFIG_PATH: &str = "/etc/telematics-generator/config.toml";

/// Command-line arguments parser.
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Query server host address
    #[arg(long, env = "TELEMATICS_SERVER_HOST")]
    pub host: Option<String>,

    /// Query server port
    #[arg(long, env = "TELEMATICS_SERVER_PORT")]
    pub port: Option<u16>,

    /// Number of records retained in memory
    #[arg(long, env = "TELEMATICS_CACHE_SIZE")]
    pub cache_size: Option<u64>,

    /// Number of simulated sources (one producer task each)
    #[arg(long, env = "TELEMATICS_SOURCES")]
    pub sources: Option<u32>,

    /// Upper bound (exclusive) for generated speeds, km/h
    #[arg(long, env = "TELEMATICS_MAX_SPEED")]
    pub max_speed: Option<u32>,

    /// Upper bound (exclusive) for the delay between records, seconds
    #[arg(long, env = "TELEMATICS_MAX_TIME_STEP")]
    pub max_time_step: Option<f64>,

    /// Publisher kind ("log" or "none")
    #[arg(long, env = "TELEMATICS_PUBLISHER_KIND")]
    pub publisher: Option<String>,

    /// Log filter directive, e.g. "info,telemetry_cache=debug"
    #[arg(long, env = "TELEMATICS_LOG")]
    pub log: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub ingestion: IngestionConfig,
    pub publisher: PublisherConfig,
    pub logging: LoggingConfig,
}

/// Network interface and port for the Flight query service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of retained records
    pub capacity: usize,
}

/// Producer fan-in settings.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    /// Number of sources; producers are numbered 1..=sources
    pub sources: u32,
    /// Speeds are drawn from [0, max_speed)
    pub max_speed: u32,
    /// Pacing delays are drawn from [0, max_time_step_secs)
    pub max_time_step_secs: f64,
}

impl IngestionConfig {
    pub fn max_time_step(&self) -> Duration {
        Duration::from_secs_f64(self.max_time_step_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
    Log,
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublisherConfig {
    pub kind: PublisherKind,
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_topic() -> String {
    "telematics".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 50051,
            },
            store: StoreConfig { capacity: 1000 },
            ingestion: IngestionConfig {
                sources: 10,
                max_speed: 180,
                max_time_step_secs: 5.0,
            },
            publisher: PublisherConfig {
                kind: PublisherKind::Log,
                topic: default_topic(),
            },
            logging: LoggingConfig {
                filter: default_filter(),
            },
        }
    }
}

impl Settings {
    /// Loads configuration from all available sources and validates it.
    pub fn new(cli: CliArgs) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = builder.add_source(config::File::from_str(
            DEFAULT_CONFIG,
            config::FileFormat::Toml,
        ));

        if let Ok(metadata) = std::fs::metadata(DEFAULT_CONFIG_PATH) {
            if metadata.is_file() {
                builder = builder.add_source(config::File::from(PathBuf::from(DEFAULT_CONFIG_PATH)));
            }
        }

        if let Some(ref config_path) = cli.config {
            builder = builder.add_source(config::File::from(config_path.clone()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TELEMATICS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(ref host) = cli.host {
            builder = builder.set_override("server.host", host.as_str())?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(capacity) = cli.cache_size {
            builder = builder.set_override("store.capacity", capacity)?;
        }
        if let Some(sources) = cli.sources {
            builder = builder.set_override("ingestion.sources", sources)?;
        }
        if let Some(max_speed) = cli.max_speed {
            builder = builder.set_override("ingestion.max_speed", max_speed)?;
        }
        if let Some(step) = cli.max_time_step {
            builder = builder.set_override("ingestion.max_time_step_secs", step)?;
        }
        if let Some(ref publisher) = cli.publisher {
            builder = builder.set_override("publisher.kind", publisher.as_str())?;
        }
        if let Some(ref filter) = cli.log {
            builder = builder.set_override("logging.filter", filter.as_str())?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values the store and the producers cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.capacity == 0 {
            return Err(ConfigError::Message("store.capacity must be at least 1".into()));
        }
        if self.ingestion.sources == 0 {
            return Err(ConfigError::Message("ingestion.sources must be at least 1".into()));
        }
        if self.ingestion.max_speed == 0 {
            return Err(ConfigError::Message("ingestion.max_speed must be at least 1".into()));
        }
        let step = self.ingestion.max_time_step_secs;
        if !step.is_finite() || step <= 0.0 {
            return Err(ConfigError::Message(format!(
                "ingestion.max_time_step_secs must be a positive number, got {}",
                step
            )));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
