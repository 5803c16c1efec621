use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use crate::AppState;

const STORE_TIMEOUT: Duration = Duration::from_secs(5);
const REDIS_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub components: HashMap<String, ComponentHealth>,
}

/// The store is critical, the response cache only degrades the service.
pub async fn handler(state: AppState) -> (StatusCode, Json<HealthResponse>) {
    let mut components = HashMap::new();

    let store = state.service.store().clone();
    let (store_health, redis_health) = tokio::join!(
        probe(STORE_TIMEOUT, async move {
            store.ping().await.map_err(|e| e.to_string())
        }),
        async {
            match &state.cache {
                Some(cache) => Some(
                    probe(REDIS_TIMEOUT, async {
                        cache.ping()
                            .await
                            .map_err(|e| e.to_string())
                    })
                    .await,
                ),
                None => None,
            }
        },
    );

    components.insert("store".to_string(), store_health);
    if let Some(redis_health) = redis_health {
        components.insert("redis_cache".to_string(), redis_health);
    }

    let overall = overall_status(&components, state.shutdown.is_shutting_down());
    let status_code = if overall == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status_code,
        Json(HealthResponse {
            status: overall,
            components,
        }),
    )
}

fn overall_status(
    components: &HashMap<String, ComponentHealth>,
    is_shutting_down: bool,
) -> HealthStatus {
    let critical_unhealthy = is_shutting_down
        || components
            .get("store")
            .is_some_and(|c| c.status == HealthStatus::Unhealthy);

    let any_unhealthy = components
        .values()
        .any(|c| c.status == HealthStatus::Unhealthy);

    if critical_unhealthy {
        HealthStatus::Unhealthy
    } else if any_unhealthy {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

async fn probe<F>(timeout: Duration, check: F) -> ComponentHealth
where
    F: Future<Output = Result<(), String>>,
{
    let start = Instant::now();
    let result = tokio::time::timeout(timeout, check).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(())) => ComponentHealth {
            status: HealthStatus::Healthy,
            latency_ms: Some(latency_ms),
            error: None,
        },
        Ok(Err(e)) => ComponentHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: Some(latency_ms),
            error: Some(e),
        },
        Err(_) => ComponentHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: Some(latency_ms),
            error: Some("timeout".to_string()),
        },
    }
}
