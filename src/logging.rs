//! Tracing subscriber setup

use crate::config::LoggingConfig;
use anyhow::{anyhow, bail, Result};
use tracing_subscriber::EnvFilter;

/// Output layout selected by `logging.format`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" | "text" => Ok(LogFormat::Compact),
            other => bail!("Unknown log format '{}' (expected json, pretty or compact)", other),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let format = LogFormat::parse(&config.format)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("estimation_engine={}", config.level)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    }
    .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_formats() {
        assert_eq!(LogFormat::parse("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("Compact").unwrap(), LogFormat::Compact);
        assert_eq!(LogFormat::parse("text").unwrap(), LogFormat::Compact);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = LogFormat::parse("xml").unwrap_err();
        assert!(err.to_string().contains("xml"));
    }
}
