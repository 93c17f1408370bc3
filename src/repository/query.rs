//! Summary reconstruction from bucket fields

use super::{parse_counter, parse_float, StoreSummaryRepository};
use crate::error::Result;
use crate::model::{MeasurementType, Summary, SummaryEntry, SummaryType};
use crate::schema::{self, COUNTER_FIELD};
use crate::store::SummaryStore;
use tracing::debug;

impl<S: SummaryStore> StoreSummaryRepository<S> {
    pub(super) fn assemble(
        &self,
        sensor_id: u64,
        measurement_types: &[MeasurementType],
        summary_types: &[SummaryType],
    ) -> Result<Option<Summary>> {
        if !self
            .store
            .sismember(&schema::sensor_keys(), &sensor_id.to_string())?
        {
            debug!(sensor_id, "summary requested for unknown sensor");
            return Ok(None);
        }

        let measurement_types = expand(measurement_types, &MeasurementType::ALL);
        let summary_types = expand(summary_types, &SummaryType::ALL);

        let mut summary = Summary::new(sensor_id);
        for &measurement_type in &measurement_types {
            let key = schema::summary_key(sensor_id, measurement_type);
            for &summary_type in &summary_types {
                let entry = self.read_entry(&key, summary_type)?;
                summary.add_value(measurement_type, entry);
            }
        }
        Ok(Some(summary))
    }

    /// Missing fields read as zero
    fn read_entry(&self, key: &str, summary_type: SummaryType) -> Result<SummaryEntry> {
        let mut entry = SummaryEntry::empty(summary_type);
        let field = summary_type.as_field();
        if let Some(raw) = self.store.hget(key, field)? {
            entry.value = parse_float(key, field, &raw)?;
        }
        if let Some(raw) = self.store.hget(key, COUNTER_FIELD)? {
            entry.counter = parse_counter(key, COUNTER_FIELD, &raw)?;
        }
        Ok(entry)
    }
}

/// An empty filter selects everything; duplicates keep their first position
fn expand<T: Copy + PartialEq>(requested: &[T], all: &[T]) -> Vec<T> {
    let source = if requested.is_empty() { all } else { requested };
    let mut out = Vec::with_capacity(source.len());
    for &item in source {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
