//! Change-capture event consumer
//!
//! Accepts one encoded message at a time, decodes it into an [`Observation`]
//! and hands it to the repository. Messages may be a bare record
//! (`{"sensorId":1,"measurementType":"TEMPERATURE","measurement":20.5}`)
//! or a Debezium-style envelope carrying the record as the `after` image,
//! optionally wrapped in `payload`.

use crate::error::Result;
use crate::model::Observation;
use crate::repository::SummaryRepository;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Decode a message. `Ok(None)` means it carries no new row image (a delete).
pub fn decode(message: &str) -> Result<Option<Observation>> {
    let mut value: Value = serde_json::from_str(message)?;
    if let Some(payload) = value.get_mut("payload").map(Value::take) {
        value = payload;
    }
    match value.get_mut("after").map(Value::take) {
        Some(Value::Null) => Ok(None),
        Some(after) => Ok(Some(serde_json::from_value(after)?)),
        None => Ok(Some(serde_json::from_value(value)?)),
    }
}

/// Counters for messages seen by a consumer
#[derive(Debug, Default)]
pub struct ConsumerStats {
    pub applied: AtomicU64,
    pub skipped: AtomicU64,
    pub failed: AtomicU64,
}

impl ConsumerStats {
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.applied.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

/// Feeds decoded change events into a [`SummaryRepository`]
pub struct CdcEventConsumer<R> {
    repository: R,
    stats: ConsumerStats,
}

impl<R: SummaryRepository> CdcEventConsumer<R> {
    pub fn new(repository: R) -> Self {
        CdcEventConsumer {
            repository,
            stats: ConsumerStats::default(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    /// Decode and apply one message.
    ///
    /// Decode failures never reach the store. Store failures are returned
    /// unchanged; retrying is up to the caller.
    pub fn handle(&self, message: &str) -> Result<()> {
        let observation = match decode(message) {
            Ok(Some(observation)) => observation,
            Ok(None) => {
                debug!("change event without row image, skipping");
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "undecodable change event");
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        match self.repository.handle(&observation) {
            Ok(()) => {
                self.stats.applied.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                warn!(
                    sensor_id = observation.sensor_id,
                    error = %e,
                    "failed to apply observation"
                );
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}
