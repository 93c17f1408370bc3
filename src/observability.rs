//! Tracing setup
//!
//! Installs a `tracing-subscriber` registry with an environment filter and a
//! fmt layer (plain text or JSON lines). `RUST_LOG` wins over the configured
//! filter directive.

use crate::config::{LogConfig, LogFormat};
use crate::error::{Result, SummaryError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if set and valid, else the configured directive
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| SummaryError::Config(format!("log filter {:?}: {}", config.filter, e))),
    }
}

/// Initialize global tracing. Logs go to stderr so stdout stays machine readable.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    installed.map_err(|e| SummaryError::Config(format!("tracing already initialized: {}", e)))?;

    tracing::debug!(format = ?config.format, filter = %config.filter, "tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_filter_parses() {
        let config = LogConfig {
            filter: "sensor_summary=debug,info".to_string(),
            format: LogFormat::Text,
        };
        assert!(env_filter(&config).is_ok());
    }
}
