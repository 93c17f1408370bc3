//! Closed tag sets used as store field names and summary keys

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of physical quantity a sensor reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasurementType {
    Temperature,
    Voltage,
    Power,
    Humidity,
    Pressure,
}

impl MeasurementType {
    /// Every measurement type, in declaration order
    pub const ALL: [MeasurementType; 5] = [
        MeasurementType::Temperature,
        MeasurementType::Voltage,
        MeasurementType::Power,
        MeasurementType::Humidity,
        MeasurementType::Pressure,
    ];

    /// Lower-case projection used in store keys
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementType::Temperature => "temperature",
            MeasurementType::Voltage => "voltage",
            MeasurementType::Power => "power",
            MeasurementType::Humidity => "humidity",
            MeasurementType::Pressure => "pressure",
        }
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MeasurementType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown measurement type: {}", s))
    }
}

/// Statistic kind requestable from a summary.
///
/// The lower-case tag of each kind is also the name of the bucket field
/// holding that statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryType {
    Min,
    Max,
    Avg,
    Sum,
}

impl SummaryType {
    /// Every statistic kind, in declaration order
    pub const ALL: [SummaryType; 4] = [
        SummaryType::Min,
        SummaryType::Max,
        SummaryType::Avg,
        SummaryType::Sum,
    ];

    /// Bucket field name for this statistic
    pub fn as_field(&self) -> &'static str {
        match self {
            SummaryType::Min => "min",
            SummaryType::Max => "max",
            SummaryType::Avg => "avg",
            SummaryType::Sum => "sum",
        }
    }
}

impl fmt::Display for SummaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_field())
    }
}

impl FromStr for SummaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SummaryType::ALL
            .into_iter()
            .find(|t| t.as_field().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown summary type: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_type_parse_any_case() {
        assert_eq!(
            "TEMPERATURE".parse::<MeasurementType>(),
            Ok(MeasurementType::Temperature)
        );
        assert_eq!(
            "humidity".parse::<MeasurementType>(),
            Ok(MeasurementType::Humidity)
        );
        assert!("wind".parse::<MeasurementType>().is_err());
    }

    #[test]
    fn test_summary_type_fields_are_lowercase_tags() {
        let fields: Vec<&str> = SummaryType::ALL.iter().map(|t| t.as_field()).collect();
        assert_eq!(fields, vec!["min", "max", "avg", "sum"]);
        assert_eq!("AVG".parse::<SummaryType>(), Ok(SummaryType::Avg));
    }

    #[test]
    fn test_serde_uses_upper_case_tags() {
        let json = serde_json::to_string(&MeasurementType::Voltage).unwrap();
        assert_eq!(json, "\"VOLTAGE\"");
        let parsed: SummaryType = serde_json::from_str("\"MAX\"").unwrap();
        assert_eq!(parsed, SummaryType::Max);
    }
}
