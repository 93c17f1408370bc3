//! Running per-sensor statistics kept in a shared store
//!
//! Each (sensor, measurement type) pair owns one hash ("bucket") holding
//! `min`, `max`, `sum`, `counter` and `avg`. A bucket comes into existence
//! with its first field write; a bucket with no fields is simply one that
//! has not seen an observation yet.
//!
//! ## Consistency
//!
//! An update is a sequence of independent store calls. `sum` and `counter`
//! use the store's atomic increments so concurrent updaters never lose an
//! observation there, but `min`/`max` are read-then-write and `avg` is
//! recomputed from whatever `sum`/`counter` hold at that moment. Under
//! concurrent writers to one bucket `avg` is eventually consistent and a
//! `min`/`max` update can be lost. No lock is taken to prevent this.

mod dst;
mod query;
mod update;

pub use dst::{
    run_aggregate_batch, summarize_aggregate_batch, AggregateDSTConfig, AggregateDSTHarness,
    AggregateDSTResult,
};

use crate::error::{Result, SummaryError};
use crate::model::{MeasurementType, Observation, Summary, SummaryType};
use crate::store::SummaryStore;

/// Write and read side of the summary store
pub trait SummaryRepository: Send + Sync {
    /// Fold one observation into its bucket, registering the sensor if new
    fn handle(&self, observation: &Observation) -> Result<()>;

    /// Reconstruct a filtered summary for `sensor_id`.
    ///
    /// An empty filter means "all values" for that dimension. Returns
    /// `Ok(None)` for a sensor that was never registered.
    fn find_by_sensor_id(
        &self,
        sensor_id: u64,
        measurement_types: &[MeasurementType],
        summary_types: &[SummaryType],
    ) -> Result<Option<Summary>>;
}

/// [`SummaryRepository`] over any [`SummaryStore`]
pub struct StoreSummaryRepository<S> {
    store: S,
}

impl<S: SummaryStore> StoreSummaryRepository<S> {
    pub fn new(store: S) -> Self {
        StoreSummaryRepository { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: SummaryStore> SummaryRepository for StoreSummaryRepository<S> {
    fn handle(&self, observation: &Observation) -> Result<()> {
        self.apply(observation)
    }

    fn find_by_sensor_id(
        &self,
        sensor_id: u64,
        measurement_types: &[MeasurementType],
        summary_types: &[SummaryType],
    ) -> Result<Option<Summary>> {
        self.assemble(sensor_id, measurement_types, summary_types)
    }
}

fn parse_float(key: &str, field: &str, raw: &str) -> Result<f64> {
    raw.parse()
        .map_err(|_| SummaryError::corrupt(key, field, raw))
}

fn parse_counter(key: &str, field: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| SummaryError::corrupt(key, field, raw))
}
