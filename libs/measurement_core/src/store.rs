use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::reading::{NewReading, Reading};

pub mod memory;

/// Durable home of readings.
///
/// Ids grow with insertion order. Every reading a successful
/// [`insert_batch`](MeasurementStore::insert_batch) returns is visible to
/// every later [`query_range`](MeasurementStore::query_range).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Stores the whole batch or nothing. Returns the readings with their
    /// ids, in input order.
    async fn insert_batch(
        &self,
        readings: Vec<NewReading>,
    ) -> Result<Vec<Reading>, StoreError>;

    /// Readings of `device_id` with `start <= timestamp <= end`, in no
    /// particular order.
    async fn query_range(
        &self,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    /// Cheap liveness probe used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn shutdown(&self, _timeout: Duration) -> Result<(), StoreError> {
        Ok(())
    }
}
