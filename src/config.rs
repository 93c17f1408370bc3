//! Service configuration
//!
//! Loaded from an optional TOML file, then overridden from environment
//! variables:
//!
//! - `SUMMARY_STORE`: `memory` or `redis`
//! - `SUMMARY_REDIS_ADDR`: `host:port` of the Redis-protocol server
//! - `SUMMARY_POOL_SIZE`: idle connections kept per process
//! - `SUMMARY_WORKERS`: concurrent ingest workers
//! - `SUMMARY_LOG_FORMAT`: `text` or `json`
//!
//! `RUST_LOG` takes precedence over the configured log filter.

use crate::error::{Result, SummaryError};
use crate::store::RedisStoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub log: LogConfig,
}

/// Which store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Embedded store, lost on exit
    Memory,
    /// Redis-protocol server
    Redis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_addr: String,
    pub pool_size: usize,
    pub connect_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: StoreBackend::Redis,
            redis_addr: "127.0.0.1:6379".to_string(),
            pool_size: 16,
            connect_timeout_ms: 1000,
        }
    }
}

impl StoreConfig {
    pub fn redis(&self) -> RedisStoreConfig {
        RedisStoreConfig {
            addr: self.redis_addr.clone(),
            pool_size: self.pool_size,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum observations applied concurrently
    pub workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig { workers: 8 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl ServiceConfig {
    /// Load from `path` (if given) and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SummaryError::Config(format!("{}: {}", path.display(), e)))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SummaryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Worker and pool counts must be in `1..=u32::MAX`
    pub fn validate(&self) -> Result<()> {
        check_count("ingest.workers", self.ingest.workers)?;
        check_count("store.pool_size", self.store.pool_size)
    }

    /// Apply overrides from a variable lookup (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SUMMARY_STORE") {
            self.store.backend = match v.to_ascii_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "redis" => StoreBackend::Redis,
                other => {
                    return Err(SummaryError::Config(format!(
                        "SUMMARY_STORE must be memory or redis, got {:?}",
                        other
                    )))
                }
            };
        }
        if let Some(v) = lookup("SUMMARY_REDIS_ADDR") {
            self.store.redis_addr = v;
        }
        if let Some(v) = lookup("SUMMARY_POOL_SIZE") {
            self.store.pool_size = parse_number("SUMMARY_POOL_SIZE", &v)?;
        }
        if let Some(v) = lookup("SUMMARY_WORKERS") {
            self.ingest.workers = parse_number("SUMMARY_WORKERS", &v)?;
        }
        if let Some(v) = lookup("SUMMARY_LOG_FORMAT") {
            self.log.format = match v.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => {
                    return Err(SummaryError::Config(format!(
                        "SUMMARY_LOG_FORMAT must be text or json, got {:?}",
                        other
                    )))
                }
            };
        }
        Ok(())
    }
}

const MAX_COUNT: usize = u32::MAX as usize;

fn check_count(name: &str, n: usize) -> Result<()> {
    if (1..=MAX_COUNT).contains(&n) {
        Ok(())
    } else {
        Err(SummaryError::Config(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_COUNT, n
        )))
    }
}

fn parse_number(name: &str, value: &str) -> Result<usize> {
    let n = value.parse::<usize>().map_err(|_| {
        SummaryError::Config(format!("{} must be a positive integer, got {:?}", name, value))
    })?;
    check_count(name, n)?;
    Ok(n)
}
