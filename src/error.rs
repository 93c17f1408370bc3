//! Error type shared by the store clients, the repository and the consumer.

use std::io::Error as IoError;

/// Errors raised while talking to the store or decoding input.
#[derive(Debug)]
pub enum SummaryError {
    /// Store unreachable or the connection failed mid-request
    Io(IoError),
    /// Remote store sent a reply we could not interpret
    Protocol(String),
    /// Store answered with an error reply (e.g. WRONGTYPE)
    Store(String),
    /// A stored numeric field did not parse
    Corrupt {
        key: String,
        field: String,
        value: String,
    },
    /// Observation rejected before touching the store (non-finite reading)
    InvalidObservation { sensor_id: u64, measurement: f64 },
    /// Change-capture message could not be decoded
    Decode(serde_json::Error),
    /// Configuration could not be loaded
    Config(String),
}

impl std::fmt::Display for SummaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryError::Io(e) => write!(f, "store I/O error: {}", e),
            SummaryError::Protocol(msg) => write!(f, "protocol error: {}", msg),
            SummaryError::Store(msg) => write!(f, "store error: {}", msg),
            SummaryError::Corrupt { key, field, value } => write!(
                f,
                "corrupt field {}.{}: {:?} is not a number",
                key, field, value
            ),
            SummaryError::InvalidObservation {
                sensor_id,
                measurement,
            } => write!(
                f,
                "invalid observation for sensor {}: {} is not finite",
                sensor_id, measurement
            ),
            SummaryError::Decode(e) => write!(f, "decode error: {}", e),
            SummaryError::Config(msg) => write!(f, "config error: {}", msg),
        }
    }
}

impl std::error::Error for SummaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SummaryError::Io(e) => Some(e),
            SummaryError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IoError> for SummaryError {
    fn from(e: IoError) -> Self {
        SummaryError::Io(e)
    }
}

impl From<serde_json::Error> for SummaryError {
    fn from(e: serde_json::Error) -> Self {
        SummaryError::Decode(e)
    }
}

impl SummaryError {
    /// Build a `Corrupt` error for a field that failed to parse
    pub fn corrupt(key: &str, field: &str, value: &str) -> Self {
        SummaryError::Corrupt {
            key: key.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// True for failures where the store itself could not be reached
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SummaryError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, SummaryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_corrupt_display() {
        let err = SummaryError::corrupt("app:sensors:1:temperature", "min", "abc");
        assert_eq!(
            err.to_string(),
            "corrupt field app:sensors:1:temperature.min: \"abc\" is not a number"
        );
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_invalid_observation_display() {
        let err = SummaryError::InvalidObservation {
            sensor_id: 4,
            measurement: f64::INFINITY,
        };
        assert_eq!(
            err.to_string(),
            "invalid observation for sensor 4: inf is not finite"
        );
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_io_is_unavailable() {
        let err: SummaryError = IoError::new(ErrorKind::ConnectionRefused, "refused").into();
        assert!(err.is_unavailable());
        assert!(std::error::Error::source(&err).is_some());
    }
}
