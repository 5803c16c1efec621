use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use tracing::{Instrument, debug, warn};

use crate::connection::Pool;

/// Key/value storage with per-namespace version counters.
///
/// Implementations never fail a caller: errors are logged and surface as
/// misses, or as `false` from [`bump_version`](Self::bump_version).
#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// `None` when the version could not be read.
    async fn current_version(&self, namespace: &str) -> Option<u64>;

    async fn get(&self, namespace: &str, version: u64, key: &str)
    -> Option<String>;

    async fn set(&self, namespace: &str, version: u64, key: &str, value: &str);

    /// Makes every entry of `namespace` unreachable. `false` when the
    /// counter could not be incremented.
    async fn bump_version(&self, namespace: &str) -> bool;

    async fn ping(&self) -> anyhow::Result<()>;
}

/// Best-effort cache whose entries are grouped into namespaces that can be
/// invalidated as a whole.
///
/// Every namespace carries a version counter that is part of each entry key.
/// Bumping the counter makes every entry written under the old version
/// unreachable; those entries then expire through their TTL. Redis failures
/// are logged and reported as misses.
#[derive(Clone)]
pub struct VersionedCache {
    pool: Pool,
    prefix: String,
    ttl: Duration,
}

impl VersionedCache {
    pub fn new(pool: Pool, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
            ttl,
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    fn version_key(&self, namespace: &str) -> String {
        format!("{}:{namespace}:version", self.prefix)
    }

    fn entry_key(&self, namespace: &str, version: u64, key: &str) -> String {
        format!("{}:{namespace}:v{version}:{key}", self.prefix)
    }

    async fn connection(&self) -> Option<crate::connection::PooledConnection> {
        match self
            .pool
            .get()
            .instrument(tracing::info_span!("acquiring_cache_connection"))
            .await
        {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!(error = %e, "cache connection unavailable");
                None
            }
        }
    }

    async fn version(
        &self,
        conn: &mut crate::connection::PooledConnection,
        namespace: &str,
    ) -> Option<u64> {
        let version: Result<Option<u64>, _> =
            conn.get(self.version_key(namespace)).await;
        match version {
            Ok(v) => Some(v.unwrap_or_default()),
            Err(e) => {
                warn!(error = %e, namespace, "could not read cache version");
                None
            }
        }
    }
}

#[async_trait]
impl VersionedStore for VersionedCache {
    async fn get(
        &self,
        namespace: &str,
        version: u64,
        key: &str,
    ) -> Option<String> {
        let mut conn = self.connection().await?;
        let entry_key = self.entry_key(namespace, version, key);

        let cached: Result<Option<String>, _> = conn.get(&entry_key).await;
        match cached {
            Ok(Some(value)) => {
                debug!("Cache hit for {entry_key}");
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "cache read failed");
                None
            }
        }
    }

    // The version must be read before the value is computed, so a bump in
    // between leaves the entry unreachable.
    async fn set(
        &self,
        namespace: &str,
        version: u64,
        key: &str,
        value: &str,
    ) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        let entry_key = self.entry_key(namespace, version, key);

        let stored: Result<(), _> =
            conn.set_ex(&entry_key, value, self.ttl.as_secs()).await;
        if let Err(e) = stored {
            warn!(error = %e, "cache write failed");
        }
    }

    async fn current_version(&self, namespace: &str) -> Option<u64> {
        let mut conn = self.connection().await?;
        self.version(&mut conn, namespace).await
    }

    async fn bump_version(&self, namespace: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };

        let bumped: Result<u64, _> =
            conn.incr(self.version_key(namespace), 1).await;
        match bumped {
            Ok(version) => {
                debug!(namespace, version, "cache version bumped");
                true
            }
            Err(e) => {
                warn!(error = %e, namespace, "cache version bump failed");
                false
            }
        }
    }

    async fn ping(&self) -> anyhow::Result<()> {
        crate::connection::ping(&self.pool).await
    }
}
