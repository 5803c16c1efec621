use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use measurement_core::CreateReading;

use crate::AppState;
use crate::api::error_recorder::ErrorRecorder;
use crate::shared::extractors::payload::Payload;
use crate::shared::extractors::request_id::RequestId;

use super::errors::{Error, HandlerResult};
use super::models::{CreateMeasurementRequest, MeasurementResponse};

const HANDLER_NAME: &str = "measurements_ingest";

/// Store a batch of readings
///
/// Either every entry is stored or none is. Stored readings are returned
/// with their ids, in the order they were sent.
#[utoipa::path(
    post,
    path = "/measurements",
    request_body = Vec<CreateMeasurementRequest>,
    responses(
        (status = 201, description = "Readings stored", body = Vec<MeasurementResponse>),
        (status = 400, description = "Invalid payload or entry", body = crate::api::ApiV1Error),
        (status = 500, description = "Internal server error", body = crate::api::ApiV1Error),
        (status = 503, description = "Measurement store unavailable", body = crate::api::ApiV1Error),
    ),
    tag = "measurements",
)]
#[tracing::instrument(skip_all, name = "measurements_ingest")]
pub async fn handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Payload(payload): Payload<Vec<CreateMeasurementRequest>>,
) -> HandlerResult<(StatusCode, Json<Vec<MeasurementResponse>>)> {
    tracing::info!(
        batch_size = payload.len(),
        request_id = %request_id,
        "Measurements ingest request",
    );

    let recorder =
        ErrorRecorder::new(&state.telemetry, HANDLER_NAME, &request_id);

    let batch: Vec<CreateReading> =
        payload.into_iter().map(CreateReading::from).collect();
    let stored = state
        .service
        .save_measurements(batch)
        .await
        .map_err(|e| recorder.record(Error::from(e)))?;

    state
        .telemetry
        .maybe_use_metrics(|m| m.record_ingested(stored.len()));

    if let Some(cache) = &state.cache {
        cache
            .invalidate(stored.iter().map(|r| r.device_id.as_str()))
            .await;
    }

    let response: Vec<MeasurementResponse> =
        stored.into_iter().map(MeasurementResponse::from).collect();

    Ok((StatusCode::CREATED, Json(response)))
}
