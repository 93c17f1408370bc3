//! Sensor observation and summary types

mod summary;
mod types;

pub use summary::{Observation, Summary, SummaryEntry};
pub use types::{MeasurementType, SummaryType};
