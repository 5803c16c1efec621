use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use measurement_core::AggregationRequest;
use parking_lot::Mutex;
use redis_cache::{VersionedCache, VersionedStore};
use serde::Serialize;
use serde::de::DeserializeOwned;

const CACHE_TTL_SECONDS: u64 = 300; // 5 minutes
const CACHE_PREFIX: &str = "measurements";

/// Query response cache, namespaced per device.
///
/// An ingest bumps the namespace of every device it touched, so a response
/// cached before the ingest is never served after it. When a bump fails the
/// device is marked stale in this process: its queries bypass the cache
/// until a retried bump succeeds. Other processes sharing the cache keep
/// serving the old entries until their TTL runs out.
#[derive(Clone)]
pub struct MeasurementCache {
    backend: Arc<dyn VersionedStore>,
    stale_devices: Arc<Mutex<HashSet<String>>>,
}

impl MeasurementCache {
    pub fn new(pool: redis_cache::connection::Pool) -> Self {
        Self::with_backend(Arc::new(VersionedCache::new(
            pool,
            CACHE_PREFIX,
            Duration::from_secs(CACHE_TTL_SECONDS),
        )))
    }

    pub fn with_backend(backend: Arc<dyn VersionedStore>) -> Self {
        Self {
            backend,
            stale_devices: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        self.backend.ping().await
    }

    /// Version to read and write the device's entries under. `None` means
    /// the cache must not be used for this request.
    pub async fn version(&self, device_id: &str) -> Option<u64> {
        let stale = self.stale_devices.lock().contains(device_id);
        if stale {
            if !self.backend.bump_version(device_id).await {
                return None;
            }
            self.stale_devices.lock().remove(device_id);
            tracing::info!(device_id, "cache invalidation recovered");
        }
        self.backend.current_version(device_id).await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        version: u64,
        request: &AggregationRequest,
    ) -> Option<T> {
        let json_str = self
            .backend
            .get(&request.device_id, version, &request_key(request))
            .await?;
        match serde_json::from_str(&json_str) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    device_id = %request.device_id,
                    "discarding unreadable cache entry"
                );
                None
            }
        }
    }

    pub async fn set<T: Serialize>(
        &self,
        version: u64,
        request: &AggregationRequest,
        value: &T,
    ) {
        match serde_json::to_string(value) {
            Ok(json_str) => {
                self.backend
                    .set(&request.device_id, version, &request_key(request), &json_str)
                    .await;
            }
            Err(e) => tracing::warn!(error = %e, "could not serialize cache entry"),
        }
    }

    pub async fn invalidate<'a>(
        &self,
        device_ids: impl IntoIterator<Item = &'a str>,
    ) {
        let unique: BTreeSet<&str> = device_ids.into_iter().collect();
        for device_id in unique {
            if !self.backend.bump_version(device_id).await {
                self.stale_devices.lock().insert(device_id.to_string());
            }
        }
    }
}

fn request_key(request: &AggregationRequest) -> String {
    format!(
        "{}:{}:{}",
        request.resolution,
        request.start_date.timestamp_millis(),
        request.end_date.timestamp_millis(),
    )
}
