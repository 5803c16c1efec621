use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::reading::{NewReading, Reading};
use crate::store::MeasurementStore;

#[derive(Debug, Default)]
struct Rows {
    readings: Vec<Reading>,
    next_id: i64,
}

/// Process-local store. Used by tests and when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMeasurementStore {
    inner: Arc<RwLock<Rows>>,
}

impl InMemoryMeasurementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MeasurementStore for InMemoryMeasurementStore {
    async fn insert_batch(
        &self,
        readings: Vec<NewReading>,
    ) -> Result<Vec<Reading>, StoreError> {
        let mut rows = self.inner.write();
        let stored: Vec<Reading> = readings
            .into_iter()
            .map(|new| {
                rows.next_id += 1;
                new.into_reading(rows.next_id)
            })
            .collect();
        rows.readings.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn query_range(
        &self,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, StoreError> {
        let rows = self.inner.read();
        Ok(rows
            .readings
            .iter()
            .filter(|r| {
                r.device_id == device_id && start <= r.timestamp && r.timestamp <= end
            })
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        i64::try_from(self.inner.read().readings.len())
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
