use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use measurement_api::AppState;
use measurement_api::metrics::ServerMetrics;
use measurement_api::shutdown::ShutdownCoordinator;
use measurement_core::{
    InMemoryMeasurementStore, MeasurementService, MeasurementStore, NewReading,
    Reading, StoreError,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use telemetry::metrics::Telemetry;

async fn build_test_server_with(store: Arc<dyn MeasurementStore>) -> TestServer {
    build_instrumented_server(store).await.0
}

/// Test server plus the telemetry its handlers and extractors report to.
async fn build_instrumented_server(
    store: Arc<dyn MeasurementStore>,
) -> (TestServer, Arc<Telemetry<ServerMetrics>>) {
    let metrics = ServerMetrics::new(None).unwrap();
    let telemetry = Telemetry::new(Some(metrics)).await.unwrap();
    let state = AppState {
        telemetry: telemetry.clone(),
        service: MeasurementService::new(store.clone()),
        cache: None,
        shutdown: Arc::new(ShutdownCoordinator::new(store, None)),
    };

    let app = axum::Router::new()
        .nest("/api", measurement_api::get_api_v1_routes(state))
        .fallback(measurement_api::fallback_handler);

    (TestServer::new(app).unwrap(), telemetry)
}

async fn build_test_server() -> TestServer {
    build_test_server_with(Arc::new(InMemoryMeasurementStore::new())).await
}

fn reading(device: &str, timestamp: &str, energy: i64, power: i64) -> Value {
    json!({
        "idDispositivo": device,
        "timestamp": timestamp,
        "activeEnergy": energy,
        "activePower": power
    })
}

/// Readings at 00:00 (1), 00:30 (1) and 01:00 (2) for `meter-x`, plus one
/// reading of another device inside the same day.
async fn seed_scenario(server: &TestServer) {
    server
        .post("/api/measurements")
        .json(&json!([
            reading("meter-x", "2024-01-01T00:00:00Z", 1, 1),
            reading("meter-x", "2024-01-01T00:30:00Z", 1, 1),
            reading("meter-x", "2024-01-01T01:00:00Z", 2, 2),
            reading("meter-y", "2024-01-01T00:45:00Z", 100, 100),
        ]))
        .await
        .assert_status(StatusCode::CREATED);
}

async fn query(
    server: &TestServer,
    device: &str,
    start: &str,
    end: &str,
    resolution: Option<&str>,
) -> Value {
    let mut request = server
        .get(&format!("/api/device/{device}/measurements"))
        .add_query_param("startDate", start)
        .add_query_param("endDate", end);
    if let Some(resolution) = resolution {
        request = request.add_query_param("resolution", resolution);
    }

    let response = request.await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn test_ingest_returns_stored_rows_in_order() {
    let server = build_test_server().await;

    let response = server
        .post("/api/measurements")
        .json(&json!([
            reading("meter-1", "2024-01-01T00:30:00Z", 5, 6),
            reading("meter-1", "2024-01-01 00:00:00+00", 7, 8),
        ]))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["idDispositivo"], "meter-1");
    assert_eq!(rows[0]["timestamp"], "2024-01-01T00:30:00.000Z");
    assert_eq!(rows[0]["activeEnergy"], 5);
    assert_eq!(rows[1]["timestamp"], "2024-01-01T00:00:00.000Z");
    assert!(rows[0]["id"].as_i64().unwrap() < rows[1]["id"].as_i64().unwrap());
}

#[tokio::test]
async fn test_empty_batch_is_accepted() {
    let server = build_test_server().await;

    let response = server.post("/api/measurements").json(&json!([])).await;

    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>(), json!([]));
}

#[tokio::test]
async fn test_day_resolution_sums_the_day() {
    let server = build_test_server().await;
    seed_scenario(&server).await;

    let body = query(
        &server,
        "meter-x",
        "2024-01-01T00:00:00Z",
        "2024-01-02T11:00:00Z",
        Some("day"),
    )
    .await;

    assert_eq!(
        body,
        json!({
            "measurements": [
                {
                    "date": "2024-01-01T00:00:00.000Z",
                    "accumulatedEnergy": 4,
                    "accumulatedPower": 4
                }
            ]
        })
    );
}

#[tokio::test]
async fn test_resolution_defaults_to_day() {
    let server = build_test_server().await;
    seed_scenario(&server).await;

    let body = query(
        &server,
        "meter-x",
        "2024-01-01T00:00:00Z",
        "2024-01-02T11:00:00Z",
        None,
    )
    .await;

    assert_eq!(body["measurements"].as_array().unwrap().len(), 1);
    assert_eq!(body["measurements"][0]["accumulatedEnergy"], 4);
}

#[tokio::test]
async fn test_hour_resolution_splits_buckets() {
    let server = build_test_server().await;
    seed_scenario(&server).await;

    let body = query(
        &server,
        "meter-x",
        "2024-01-01T00:00:00Z",
        "2024-01-02T11:00:00Z",
        Some("HOUR"),
    )
    .await;

    assert_eq!(
        body,
        json!({
            "measurements": [
                {
                    "date": "2024-01-01T00:00:00.000Z",
                    "accumulatedEnergy": 2,
                    "accumulatedPower": 2
                },
                {
                    "date": "2024-01-01T01:00:00.000Z",
                    "accumulatedEnergy": 2,
                    "accumulatedPower": 2
                }
            ]
        })
    );
}

#[tokio::test]
async fn test_raw_resolution_returns_readings_in_range() {
    let server = build_test_server().await;
    seed_scenario(&server).await;

    let body = query(
        &server,
        "meter-x",
        "2024-01-01T00:20:00Z",
        "2024-01-01T00:50:00Z",
        Some("raw"),
    )
    .await;

    assert_eq!(
        body,
        json!({
            "measurements": [
                {
                    "date": "2024-01-01T00:30:00.000Z",
                    "activeEnergy": 1,
                    "activePower": 1
                }
            ]
        })
    );
}

#[tokio::test]
async fn test_other_devices_are_excluded() {
    let server = build_test_server().await;
    seed_scenario(&server).await;

    let body = query(
        &server,
        "meter-y",
        "2024-01-01T00:00:00Z",
        "2024-01-02T00:00:00Z",
        Some("raw"),
    )
    .await;

    assert_eq!(body["measurements"].as_array().unwrap().len(), 1);
    assert_eq!(body["measurements"][0]["activeEnergy"], 100);
}

#[tokio::test]
async fn test_unknown_device_and_inverted_range_are_empty() {
    let server = build_test_server().await;
    seed_scenario(&server).await;

    let unknown = query(
        &server,
        "meter-z",
        "2024-01-01T00:00:00Z",
        "2024-01-02T00:00:00Z",
        None,
    )
    .await;
    assert_eq!(unknown, json!({ "measurements": [] }));

    let inverted = query(
        &server,
        "meter-x",
        "2024-01-02T00:00:00Z",
        "2024-01-01T00:00:00Z",
        Some("hour"),
    )
    .await;
    assert_eq!(inverted, json!({ "measurements": [] }));
}

#[tokio::test]
async fn test_missing_start_date_is_rejected() {
    let server = build_test_server().await;
    let request_id = "0b8f5a52-8d8e-4a5e-9e53-0c6f6d0f5a11";

    let response = server
        .get("/api/device/meter-x/measurements")
        .add_query_param("endDate", "2024-01-02T00:00:00Z")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(request_id),
        )
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["requestId"], request_id);
    assert_eq!(body["details"][0]["field"], "startDate");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_unparsable_date_is_rejected() {
    let server = build_test_server().await;

    let response = server
        .get("/api/device/meter-x/measurements")
        .add_query_param("startDate", "yesterday")
        .add_query_param("endDate", "2024-01-02T00:00:00Z")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["details"][0]["field"], "startDate");
    assert_eq!(body["details"][0]["code"], "invalid_timestamp");
}

#[tokio::test]
async fn test_unsupported_resolution_is_rejected() {
    let server = build_test_server().await;

    let response = server
        .get("/api/device/meter-x/measurements")
        .add_query_param("startDate", "2024-01-01T00:00:00Z")
        .add_query_param("endDate", "2024-01-02T00:00:00Z")
        .add_query_param("resolution", "week")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["details"][0]["field"], "resolution");
}

#[tokio::test]
async fn test_invalid_entry_rejects_whole_batch() {
    let server = build_test_server().await;

    let response = server
        .post("/api/measurements")
        .json(&json!([
            reading("meter-x", "2024-01-01T00:00:00Z", 1, 1),
            reading("meter-x", "not a date", 1, 1),
        ]))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["details"][0]["field"], "[1].timestamp");
    assert_eq!(body["details"][0]["code"], "validation_error");

    let stored = query(
        &server,
        "meter-x",
        "2024-01-01T00:00:00Z",
        "2024-01-02T00:00:00Z",
        Some("raw"),
    )
    .await;
    assert_eq!(stored, json!({ "measurements": [] }));
}

#[tokio::test]
async fn test_non_numeric_energy_is_rejected() {
    let server = build_test_server().await;

    let response = server
        .post("/api/measurements")
        .json(&json!([{
            "idDispositivo": "meter-x",
            "timestamp": "2024-01-01T00:00:00Z",
            "activeEnergy": "lots",
            "activePower": 1
        }]))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    let field = body["details"][0]["field"].as_str().unwrap();
    assert!(field.contains("activeEnergy"), "{field}");
}

#[tokio::test]
async fn test_non_json_body_is_rejected() {
    let server = build_test_server().await;

    let response = server.post("/api/measurements").text("meter-x,1,1").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["details"][0]["code"], "missing_content_type");
}

#[tokio::test]
async fn test_extractor_rejections_are_counted() {
    let (server, telemetry) =
        build_instrumented_server(Arc::new(InMemoryMeasurementStore::new())).await;

    server
        .get("/api/device/meter-x/measurements")
        .add_query_param("endDate", "2024-01-02T00:00:00Z")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .post("/api/measurements")
        .text("[{")
        .content_type("application/json")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .post("/api/measurements")
        .text("meter-x,1,1")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let rendered = telemetry.get_metrics().await;
    for line in [
        r#"request_errors{error_code="validation_failed",handler="validated_query"} 1"#,
        r#"request_errors{error_code="invalid_payload",handler="payload"} 1"#,
        r#"request_errors{error_code="missing_content_type",handler="payload"} 1"#,
    ] {
        assert!(rendered.contains(line), "missing `{line}` in:\n{rendered}");
    }
}

#[tokio::test]
async fn test_unknown_route_returns_envelope() {
    let server = build_test_server().await;

    let response = server.get("/api/nope").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["details"][0]["code"], "route_not_found");
    assert!(body["requestId"].is_string());
}

struct UnavailableStore;

#[async_trait]
impl MeasurementStore for UnavailableStore {
    async fn insert_batch(
        &self,
        _readings: Vec<NewReading>,
    ) -> Result<Vec<Reading>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn query_range(
        &self,
        _device_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_unavailable_store_maps_to_503() {
    let server = build_test_server_with(Arc::new(UnavailableStore)).await;

    let response = server
        .get("/api/device/meter-x/measurements")
        .add_query_param("startDate", "2024-01-01T00:00:00Z")
        .add_query_param("endDate", "2024-01-02T00:00:00Z")
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["details"][0]["code"], "store_unavailable");

    let response = server
        .post("/api/measurements")
        .json(&json!([reading("meter-x", "2024-01-01T00:00:00Z", 1, 1)]))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
