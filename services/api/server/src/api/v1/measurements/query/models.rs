use measurement_core::timestamp::{format_instant, parse_timestamp};
use measurement_core::{MeasurementOutput, OutputPoint, Resolution};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Query string of `GET /device/{deviceId}/measurements`
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MeasurementsQuery {
    /// Start of the range, inclusive
    #[validate(
        required(message = "startDate is required"),
        custom(function = "validate_timestamp")
    )]
    #[param(example = "2024-01-01T00:00:00Z")]
    pub start_date: Option<String>,

    /// End of the range, inclusive
    #[validate(
        required(message = "endDate is required"),
        custom(function = "validate_timestamp")
    )]
    #[param(example = "2024-01-02T11:00:00Z")]
    pub end_date: Option<String>,

    /// One of `day`, `hour`, `raw`; defaults to `day`
    #[validate(custom(function = "validate_resolution"))]
    #[param(example = "hour")]
    pub resolution: Option<String>,
}

fn validate_timestamp(value: &str) -> Result<(), ValidationError> {
    parse_timestamp(value).map(|_| ()).map_err(|e| {
        ValidationError::new("invalid_timestamp").with_message(e.to_string().into())
    })
}

fn validate_resolution(value: &str) -> Result<(), ValidationError> {
    value.parse::<Resolution>().map(|_| ()).map_err(|e| {
        ValidationError::new("unsupported_resolution")
            .with_message(e.to_string().into())
    })
}

/// Sum of the readings of one day or hour bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccumulatedPoint {
    /// Bucket start
    #[schema(example = "2024-01-01T00:00:00.000Z")]
    pub date: String,
    #[schema(value_type = i64, example = 4)]
    pub accumulated_energy: i128,
    #[schema(value_type = i64, example = 4)]
    pub accumulated_power: i128,
}

/// A single stored reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawPoint {
    #[schema(example = "2024-01-01T00:30:00.000Z")]
    pub date: String,
    pub active_energy: i64,
    pub active_power: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum MeasurementPoint {
    Accumulated(AccumulatedPoint),
    Raw(RawPoint),
}

impl From<OutputPoint> for MeasurementPoint {
    fn from(point: OutputPoint) -> Self {
        match point {
            OutputPoint::Bucket {
                date,
                accumulated_energy,
                accumulated_power,
            } => MeasurementPoint::Accumulated(AccumulatedPoint {
                date: format_instant(&date),
                accumulated_energy,
                accumulated_power,
            }),
            OutputPoint::Raw {
                date,
                active_energy,
                active_power,
            } => MeasurementPoint::Raw(RawPoint {
                date: format_instant(&date),
                active_energy,
                active_power,
            }),
        }
    }
}

/// Response of a measurement query
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MeasurementsResponse {
    pub measurements: Vec<MeasurementPoint>,
}

impl From<MeasurementOutput> for MeasurementsResponse {
    fn from(output: MeasurementOutput) -> Self {
        Self {
            measurements: output
                .measurements
                .into_iter()
                .map(MeasurementPoint::from)
                .collect(),
        }
    }
}

/// Cached form of a [`MeasurementsResponse`]. Points carry their kind as a
/// tag, so sums outside the `u64` range read back exactly.
#[derive(Debug, Serialize, Deserialize)]
pub struct CachedMeasurements {
    points: Vec<CachedPoint>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum CachedPoint {
    Accumulated(AccumulatedPoint),
    Raw(RawPoint),
}

impl From<&MeasurementsResponse> for CachedMeasurements {
    fn from(response: &MeasurementsResponse) -> Self {
        let points = response
            .measurements
            .iter()
            .map(|point| match point {
                MeasurementPoint::Accumulated(p) => CachedPoint::Accumulated(p.clone()),
                MeasurementPoint::Raw(p) => CachedPoint::Raw(p.clone()),
            })
            .collect();
        Self { points }
    }
}

impl From<CachedMeasurements> for MeasurementsResponse {
    fn from(cached: CachedMeasurements) -> Self {
        let measurements = cached
            .points
            .into_iter()
            .map(|point| match point {
                CachedPoint::Accumulated(p) => MeasurementPoint::Accumulated(p),
                CachedPoint::Raw(p) => MeasurementPoint::Raw(p),
            })
            .collect();
        Self { measurements }
    }
}
