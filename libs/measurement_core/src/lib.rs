//! # Measurement core
//!
//! Everything with non-trivial semantics lives here: bucketing readings into
//! UTC days and hours, summing them, parsing the timestamps clients send and
//! validating ingest batches. Storage sits behind [`store::MeasurementStore`]
//! so the rules can be tested without a database.

pub mod aggregator;
pub mod error;
pub mod reading;
pub mod resolution;
pub mod service;
pub mod store;
pub mod timestamp;

pub use aggregator::{OutputPoint, aggregate};
pub use error::{
    MeasurementError, StoreError, UnsupportedResolutionError, ValidationError,
};
pub use reading::{CreateReading, NewReading, Reading};
pub use resolution::Resolution;
pub use service::{AggregationRequest, MeasurementOutput, MeasurementService};
pub use store::MeasurementStore;
pub use store::memory::InMemoryMeasurementStore;
