//! Incremental per-sensor statistics over a Redis-style store
//!
//! Change-capture events are decoded into [`Observation`]s and folded into
//! running `min`/`max`/`sum`/`counter`/`avg` buckets, one hash per
//! (sensor, measurement type). Queries rebuild a filtered [`Summary`] from
//! those buckets.

pub mod config;
pub mod consumer;
pub mod error;
pub mod model;
pub mod observability;
pub mod repository;
pub mod schema;
pub mod store;

pub use consumer::CdcEventConsumer;
pub use error::{Result, SummaryError};
pub use model::{MeasurementType, Observation, Summary, SummaryEntry, SummaryType};
pub use repository::{StoreSummaryRepository, SummaryRepository};
pub use store::{InMemoryStore, RedisStore, SummaryStore};
