use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use measurement_core::AggregationRequest;

use crate::AppState;
use crate::api::error_recorder::ErrorRecorder;
use crate::shared::extractors::query::ValidatedQuery;
use crate::shared::extractors::request_id::RequestId;

use super::errors::{Error, HandlerResult};
use super::models::{CachedMeasurements, MeasurementsQuery, MeasurementsResponse};

const HANDLER_NAME: &str = "measurements_query";

/// Measurements of one device over an inclusive time range
///
/// Returns the raw readings, or their sums per UTC day or hour. Buckets
/// without readings are omitted.
#[utoipa::path(
    get,
    path = "/device/{device_id}/measurements",
    params(
        ("device_id" = String, Path, description = "Device identifier"),
        MeasurementsQuery,
    ),
    responses(
        (status = 200, description = "Measurements in ascending date order", body = MeasurementsResponse),
        (status = 400, description = "Missing or invalid query parameters", body = crate::api::ApiV1Error),
        (status = 500, description = "Internal server error", body = crate::api::ApiV1Error),
        (status = 503, description = "Measurement store unavailable", body = crate::api::ApiV1Error),
    ),
    tag = "measurements",
)]
#[tracing::instrument(skip_all, name = "measurements_query")]
pub async fn handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(device_id): Path<String>,
    ValidatedQuery(query): ValidatedQuery<MeasurementsQuery>,
) -> HandlerResult<(StatusCode, Json<MeasurementsResponse>)> {
    let started = Instant::now();
    let recorder =
        ErrorRecorder::new(&state.telemetry, HANDLER_NAME, &request_id);

    let request = AggregationRequest::parse(
        &device_id,
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        query.resolution.as_deref(),
    )
    .map_err(|e| recorder.record(Error::from(e)))?;

    tracing::info!(
        device_id = %request.device_id,
        start_date = %request.start_date,
        end_date = %request.end_date,
        resolution = %request.resolution,
        request_id = %request_id,
        "Measurements query request",
    );

    let version = match &state.cache {
        Some(cache) => cache.version(&request.device_id).await,
        None => None,
    };

    if let (Some(cache), Some(version)) = (&state.cache, version)
        && let Some(cached) =
            cache.get::<CachedMeasurements>(version, &request).await
    {
        observe(&state, &request, started);
        return Ok((StatusCode::OK, Json(MeasurementsResponse::from(cached))));
    }

    let output = state
        .service
        .get_measurements(&request)
        .await
        .map_err(|e| recorder.record(Error::from(e)))?;
    let response = MeasurementsResponse::from(output);

    if let (Some(cache), Some(version)) = (&state.cache, version) {
        cache
            .set(version, &request, &CachedMeasurements::from(&response))
            .await;
    }

    observe(&state, &request, started);
    Ok((StatusCode::OK, Json(response)))
}

fn observe(state: &AppState, request: &AggregationRequest, started: Instant) {
    let elapsed = started.elapsed().as_secs_f64();
    state.telemetry.maybe_use_metrics(|m| {
        m.observe_query(request.resolution.as_str(), elapsed);
    });
}
