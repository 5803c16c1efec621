use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::aggregator::{OutputPoint, aggregate};
use crate::error::{MeasurementError, ValidationError};
use crate::reading::{CreateReading, Reading};
use crate::resolution::Resolution;
use crate::store::MeasurementStore;
use crate::timestamp::parse_timestamp;

/// A parsed query for one device over an inclusive time range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRequest {
    pub device_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub resolution: Resolution,
}

impl AggregationRequest {
    /// Builds a request from raw path and query string values. A missing
    /// resolution means [`Resolution::Day`].
    pub fn parse(
        device_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        resolution: Option<&str>,
    ) -> Result<Self, MeasurementError> {
        if device_id.is_empty() {
            return Err(
                ValidationError::field("deviceId", "must be a non-empty string").into(),
            );
        }

        let start_date = required_instant("startDate", start_date)?;
        let end_date = required_instant("endDate", end_date)?;
        let resolution = match resolution {
            Some(value) => value.parse()?,
            None => Resolution::default(),
        };

        Ok(Self {
            device_id: device_id.to_string(),
            start_date,
            end_date,
            resolution,
        })
    }
}

fn required_instant(
    field: &str,
    value: Option<&str>,
) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.ok_or_else(|| ValidationError::field(field, "is required"))?;
    parse_timestamp(value).map_err(|e| ValidationError::field(field, e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeasurementOutput {
    pub measurements: Vec<OutputPoint>,
}

/// Query and ingest operations over a [`MeasurementStore`].
#[derive(Clone)]
pub struct MeasurementService {
    store: Arc<dyn MeasurementStore>,
}

impl MeasurementService {
    pub fn new(store: Arc<dyn MeasurementStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn MeasurementStore> {
        &self.store
    }

    #[tracing::instrument(
        skip_all,
        fields(device_id = %request.device_id, resolution = %request.resolution)
    )]
    pub async fn get_measurements(
        &self,
        request: &AggregationRequest,
    ) -> Result<MeasurementOutput, MeasurementError> {
        if request.device_id.is_empty() {
            return Err(
                ValidationError::field("deviceId", "must be a non-empty string").into(),
            );
        }
        if request.start_date > request.end_date {
            debug!("inverted range, nothing to fetch");
            return Ok(MeasurementOutput::default());
        }

        let readings = self
            .store
            .query_range(&request.device_id, request.start_date, request.end_date)
            .await?;
        debug!(readings = readings.len(), "fetched readings");

        Ok(MeasurementOutput {
            measurements: aggregate(readings, request.resolution),
        })
    }

    /// Validates every entry before storing any of them; the first invalid
    /// entry rejects the whole batch.
    #[tracing::instrument(skip_all, fields(batch_size = batch.len()))]
    pub async fn save_measurements(
        &self,
        batch: Vec<CreateReading>,
    ) -> Result<Vec<Reading>, MeasurementError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let readings = batch
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.validate(index))
            .collect::<Result<Vec<_>, _>>()?;

        let stored = self.store.insert_batch(readings).await?;
        info!(stored = stored.len(), "stored measurements");

        Ok(stored)
    }
}
