//! Configuration management for the estimation engine

use crate::logging::LogFormat;
use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable that overrides the configuration file location
pub const CONFIG_PATH_ENV: &str = "ESTIMATION_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS JetStream connection and consumer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// JetStream stream holding the events subject
    #[serde(default = "default_stream")]
    pub stream: String,
    /// Subject carrying both inbound and outbound envelopes
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Durable consumer name shared by all engine instances
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    /// Bounded wait for a single poll
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Bounded wait for a publish acknowledgment
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
    /// Connection timeout at startup
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Publish failures in a row before the worker gives up
    #[serde(default = "default_max_publish_failures")]
    pub max_consecutive_publish_failures: u32,
}

fn default_stream() -> String {
    "events".to_string()
}

fn default_subject() -> String {
    "events".to_string()
}

fn default_consumer_group() -> String {
    "stable-estimation-engine".to_string()
}

fn default_poll_timeout_ms() -> u64 {
    1000
}

fn default_publish_timeout_ms() -> u64 {
    5000
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_publish_failures() -> u32 {
    10
}

impl NatsConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Scaling parameters exported by the training pipeline
    pub scaler_path: String,
    /// Network weights exported by the training pipeline
    pub weights_path: String,
    /// Identifier stamped on every estimate
    #[serde(default = "default_model_id")]
    pub model_id: String,
}

fn default_model_id() -> String {
    "model-v1.0-pytorch".to_string()
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Seconds between metrics summaries (0 disables the reporter)
    pub metrics_interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            metrics_interval_secs: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file (or `ESTIMATION_CONFIG`)
    /// with `ESTIMATION__SECTION__KEY` environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("ESTIMATION").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the worker cannot start with
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("nats.url", &self.nats.url),
            ("nats.stream", &self.nats.stream),
            ("nats.subject", &self.nats.subject),
            ("nats.consumer_group", &self.nats.consumer_group),
            ("models.scaler_path", &self.models.scaler_path),
            ("models.weights_path", &self.models.weights_path),
            ("models.model_id", &self.models.model_id),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                bail!("Configuration value {} must not be empty", key);
            }
        }

        if self.nats.poll_timeout_ms == 0 || self.nats.publish_timeout_ms == 0 {
            bail!("Poll and publish timeouts must be greater than zero");
        }

        if self.nats.max_consecutive_publish_failures == 0 {
            bail!("nats.max_consecutive_publish_failures must be at least 1");
        }

        LogFormat::parse(&self.logging.format).context("Invalid logging.format")?;

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                stream: default_stream(),
                subject: default_subject(),
                consumer_group: default_consumer_group(),
                poll_timeout_ms: default_poll_timeout_ms(),
                publish_timeout_ms: default_publish_timeout_ms(),
                connect_timeout_secs: default_connect_timeout_secs(),
                max_consecutive_publish_failures: default_max_publish_failures(),
            },
            models: ModelsConfig {
                scaler_path: "models/scaler.json".to_string(),
                weights_path: "models/recovery_model.json".to_string(),
                model_id: default_model_id(),
            },
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
