//! Key layout for summary storage
//!
//! Key format:
//! - `app:sensors` (set of registered sensor ids)
//! - `app:sensors:<sensor_id>:<measurement_type>` (hash holding one bucket)
//!
//! Bucket hashes hold `min`, `max`, `sum`, `avg` and `counter` fields.

use crate::model::MeasurementType;

/// Namespace prefix shared by every key
pub const KEY_PREFIX: &str = "app";

/// Hash field holding the number of observations in a bucket
pub const COUNTER_FIELD: &str = "counter";

const SENSORS: &str = "sensors";

/// Key for the set of registered sensor ids
pub fn sensor_keys() -> String {
    format!("{}:{}", KEY_PREFIX, SENSORS)
}

/// Key for the bucket hash of one (sensor, measurement type) pair
///
/// Format: `app:sensors:<sensor_id>:<measurement_type>`
pub fn summary_key(sensor_id: u64, measurement_type: MeasurementType) -> String {
    format!(
        "{}:{}:{}:{}",
        KEY_PREFIX,
        SENSORS,
        sensor_id,
        measurement_type.as_str()
    )
}

/// Decode a bucket key back to its components
pub fn decode_summary_key(key: &str) -> Option<(u64, MeasurementType)> {
    let mut parts = key.split(':');
    if parts.next()? != KEY_PREFIX || parts.next()? != SENSORS {
        return None;
    }
    let sensor_id = parts.next()?.parse().ok()?;
    let measurement_type = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((sensor_id, measurement_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sensor_keys() {
        assert_eq!(sensor_keys(), "app:sensors");
    }

    #[test]
    fn test_summary_key_format() {
        assert_eq!(
            summary_key(42, MeasurementType::Temperature),
            "app:sensors:42:temperature"
        );
    }

    #[test]
    fn test_decode_roundtrip() {
        let key = summary_key(9001, MeasurementType::Pressure);
        assert_eq!(
            decode_summary_key(&key),
            Some((9001, MeasurementType::Pressure))
        );
    }

    #[test]
    fn test_decode_invalid_key() {
        assert!(decode_summary_key("app:sensors").is_none());
        assert!(decode_summary_key("other:sensors:1:power").is_none());
        assert!(decode_summary_key("app:sensors:x:power").is_none());
        assert!(decode_summary_key("app:sensors:1:wind").is_none());
        assert!(decode_summary_key("app:sensors:1:power:extra").is_none());
    }

    #[test]
    fn test_distinct_inputs_distinct_keys() {
        let mut seen = HashSet::new();
        for sensor_id in [0u64, 1, 2, 10, 11, 100] {
            for mt in MeasurementType::ALL {
                assert!(seen.insert(summary_key(sensor_id, mt)));
            }
        }
        assert!(!seen.contains(&sensor_keys()));
    }
}
