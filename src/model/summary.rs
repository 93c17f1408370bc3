//! Observation input record and the summary returned by queries

use super::types::{MeasurementType, SummaryType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single decoded sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub sensor_id: u64,
    pub measurement_type: MeasurementType,
    pub measurement: f64,
}

impl Observation {
    pub fn new(sensor_id: u64, measurement_type: MeasurementType, measurement: f64) -> Self {
        Observation {
            sensor_id,
            measurement_type,
            measurement,
        }
    }
}

/// One statistic for one measurement type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    #[serde(rename = "type")]
    pub summary_type: SummaryType,
    pub value: f64,
    pub counter: u64,
}

impl SummaryEntry {
    /// Entry with zero value and counter, as reported for buckets with no data
    pub fn empty(summary_type: SummaryType) -> Self {
        SummaryEntry {
            summary_type,
            value: 0.0,
            counter: 0,
        }
    }
}

/// Filtered view of a sensor's running statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub sensor_id: u64,
    pub values: BTreeMap<MeasurementType, Vec<SummaryEntry>>,
}

impl Summary {
    pub fn new(sensor_id: u64) -> Self {
        Summary {
            sensor_id,
            values: BTreeMap::new(),
        }
    }

    /// Append an entry under `measurement_type`, keeping call order
    pub fn add_value(&mut self, measurement_type: MeasurementType, entry: SummaryEntry) {
        self.values.entry(measurement_type).or_default().push(entry);
    }

    /// Entries for one measurement type (empty slice if none were added)
    pub fn entries(&self, measurement_type: MeasurementType) -> &[SummaryEntry] {
        self.values
            .get(&measurement_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Look up a single entry
    pub fn entry(
        &self,
        measurement_type: MeasurementType,
        summary_type: SummaryType,
    ) -> Option<&SummaryEntry> {
        self.entries(measurement_type)
            .iter()
            .find(|e| e.summary_type == summary_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_value_preserves_order() {
        let mut summary = Summary::new(7);
        summary.add_value(
            MeasurementType::Power,
            SummaryEntry::empty(SummaryType::Sum),
        );
        summary.add_value(
            MeasurementType::Power,
            SummaryEntry::empty(SummaryType::Min),
        );

        let kinds: Vec<SummaryType> = summary
            .entries(MeasurementType::Power)
            .iter()
            .map(|e| e.summary_type)
            .collect();
        assert_eq!(kinds, vec![SummaryType::Sum, SummaryType::Min]);
        assert!(summary.entries(MeasurementType::Voltage).is_empty());
    }

    #[test]
    fn test_observation_decodes_camel_case() {
        let json = r#"{"sensorId":42,"measurementType":"TEMPERATURE","measurement":21.5}"#;
        let obs: Observation = serde_json::from_str(json).unwrap();
        assert_eq!(obs, Observation::new(42, MeasurementType::Temperature, 21.5));
    }

    #[test]
    fn test_summary_serializes_entry_type_field() {
        let mut summary = Summary::new(1);
        summary.add_value(
            MeasurementType::Humidity,
            SummaryEntry {
                summary_type: SummaryType::Max,
                value: 55.0,
                counter: 3,
            },
        );
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["sensorId"], 1);
        assert_eq!(json["values"]["HUMIDITY"][0]["type"], "MAX");
        assert_eq!(json["values"]["HUMIDITY"][0]["counter"], 3);
    }
}
