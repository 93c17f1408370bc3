//! Incremental bucket updates

use super::{parse_counter, parse_float, StoreSummaryRepository};
use crate::error::{Result, SummaryError};
use crate::model::{Observation, SummaryType};
use crate::schema::{self, COUNTER_FIELD};
use crate::store::SummaryStore;
use tracing::debug;

impl<S: SummaryStore> StoreSummaryRepository<S> {
    pub(super) fn apply(&self, observation: &Observation) -> Result<()> {
        // NaN never compares, and an infinite sum rejects every later increment
        if !observation.measurement.is_finite() {
            return Err(SummaryError::InvalidObservation {
                sensor_id: observation.sensor_id,
                measurement: observation.measurement,
            });
        }

        self.register_sensor(observation.sensor_id)?;

        let key = schema::summary_key(observation.sensor_id, observation.measurement_type);
        let value = observation.measurement;
        self.update_min(&key, value)?;
        self.update_max(&key, value)?;
        self.update_sum_and_avg(&key, value)?;

        debug!(
            sensor_id = observation.sensor_id,
            measurement_type = %observation.measurement_type,
            value,
            "observation applied"
        );
        Ok(())
    }

    /// Set-add is idempotent; the membership probe only skips a redundant write
    fn register_sensor(&self, sensor_id: u64) -> Result<()> {
        let registry = schema::sensor_keys();
        let member = sensor_id.to_string();
        if !self.store.sismember(&registry, &member)? {
            self.store.sadd(&registry, &member)?;
            debug!(sensor_id, "registered sensor");
        }
        Ok(())
    }

    fn update_min(&self, key: &str, value: f64) -> Result<()> {
        self.replace_if(key, SummaryType::Min.as_field(), value, |new, current| {
            new < current
        })
    }

    fn update_max(&self, key: &str, value: f64) -> Result<()> {
        self.replace_if(key, SummaryType::Max.as_field(), value, |new, current| {
            new > current
        })
    }

    /// Write `value` to `field` when the field is absent or `wins(value, current)`
    fn replace_if(
        &self,
        key: &str,
        field: &str,
        value: f64,
        wins: impl Fn(f64, f64) -> bool,
    ) -> Result<()> {
        let replace = match self.store.hget(key, field)? {
            None => true,
            Some(raw) => wins(value, parse_float(key, field, &raw)?),
        };
        if replace {
            self.store.hset(key, field, &value.to_string())?;
        }
        Ok(())
    }

    fn update_sum_and_avg(&self, key: &str, value: f64) -> Result<()> {
        let sum_field = SummaryType::Sum.as_field();
        match self.store.hget(key, sum_field)? {
            None => {
                self.store.hset(key, sum_field, &value.to_string())?;
            }
            Some(raw) => {
                parse_float(key, sum_field, &raw)?;
                self.store.hincrbyfloat(key, sum_field, value)?;
            }
        }

        let counter = match self.store.hget(key, COUNTER_FIELD)? {
            None => {
                self.store.hset(key, COUNTER_FIELD, "1")?;
                1
            }
            Some(raw) => {
                parse_counter(key, COUNTER_FIELD, &raw)?;
                self.store.hincrby(key, COUNTER_FIELD, 1)?
            }
        };

        // Re-read: other updaters may have advanced `sum` since our increment.
        let sum = match self.store.hget(key, sum_field)? {
            Some(raw) => parse_float(key, sum_field, &raw)?,
            None => return Err(SummaryError::corrupt(key, sum_field, "")),
        };
        let avg = sum / counter as f64;
        self.store
            .hset(key, SummaryType::Avg.as_field(), &avg.to_string())?;
        Ok(())
    }
}
