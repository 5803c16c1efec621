use measurement_core::timestamp::format_instant;
use measurement_core::{CreateReading, Reading};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use utoipa::ToSchema;

/// One reading of an ingest batch
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeasurementRequest {
    /// Device identifier
    #[serde(rename = "idDispositivo")]
    #[schema(example = "meter-1")]
    pub device_id: String,

    /// Instant of the reading, ISO-8601
    #[schema(example = "2024-01-01T00:30:00Z")]
    pub timestamp: String,

    #[schema(value_type = f64, example = 1)]
    pub active_energy: Number,

    #[schema(value_type = f64, example = 1)]
    pub active_power: Number,
}

impl From<CreateMeasurementRequest> for CreateReading {
    fn from(request: CreateMeasurementRequest) -> Self {
        CreateReading {
            device_id: request.device_id,
            timestamp: request.timestamp,
            active_energy: request.active_energy,
            active_power: request.active_power,
        }
    }
}

/// A persisted reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementResponse {
    #[schema(example = 1)]
    pub id: i64,

    #[serde(rename = "idDispositivo")]
    #[schema(example = "meter-1")]
    pub device_id: String,

    #[schema(example = "2024-01-01T00:30:00.000Z")]
    pub timestamp: String,

    pub active_energy: i64,
    pub active_power: i64,
}

impl From<Reading> for MeasurementResponse {
    fn from(reading: Reading) -> Self {
        Self {
            id: reading.id,
            timestamp: format_instant(&reading.timestamp),
            device_id: reading.device_id,
            active_energy: reading.active_energy,
            active_power: reading.active_power,
        }
    }
}
