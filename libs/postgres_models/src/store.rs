use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use measurement_core::{MeasurementStore, NewReading, Reading, StoreError};

use crate::connection::{
    DatabaseConfig, Pool, WithConnectionError, establish_connection,
    shutdown_pool_with_timeout, with_connection, with_transaction,
};
use crate::models::measurements::{Measurement, NewMeasurement};

/// Rows per INSERT statement; four bind parameters each keeps every
/// statement far below the Postgres parameter limit.
pub const INSERT_CHUNK_SIZE: usize = 1000;

/// [`MeasurementStore`] backed by the `measurements` table.
///
/// Writes go through the read-write pool, range queries through the
/// read-only one. Without a replica both use the read-write pool.
#[derive(Clone)]
pub struct PgMeasurementStore {
    pool: Pool,
    read_only_pool: Option<Pool>,
}

impl PgMeasurementStore {
    pub fn new(pool: Pool, read_only_pool: Option<Pool>) -> Self {
        Self {
            pool,
            read_only_pool,
        }
    }

    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let pool = establish_connection(config.rw_url())
            .await
            .context("Failed to connect to Postgres (read-write)")?;

        let read_only_pool = if config.has_separate_read_replica() {
            Some(
                establish_connection(config.ro_url())
                    .await
                    .context("Failed to connect to Postgres (read-only)")?,
            )
        } else {
            None
        };

        Ok(Self::new(pool, read_only_pool))
    }

    /// Read-write pool, used for migrations.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    fn read_pool(&self) -> &Pool {
        self.read_only_pool.as_ref().unwrap_or(&self.pool)
    }

    /// Every distinct pool the store owns.
    fn pools(&self) -> Vec<&Pool> {
        std::iter::once(&self.pool)
            .chain(self.read_only_pool.as_ref())
            .collect()
    }
}

fn store_error(err: WithConnectionError<diesel::result::Error>) -> StoreError {
    match err {
        WithConnectionError::Pool(e) => StoreError::Unavailable(e.to_string()),
        WithConnectionError::Operation(e) => StoreError::Query(e.to_string()),
    }
}

#[async_trait]
impl MeasurementStore for PgMeasurementStore {
    #[tracing::instrument(skip_all, fields(rows = readings.len()))]
    async fn insert_batch(
        &self,
        readings: Vec<NewReading>,
    ) -> Result<Vec<Reading>, StoreError> {
        let rows: Vec<NewMeasurement> =
            readings.into_iter().map(NewMeasurement::from).collect();

        let inserted = with_transaction(&self.pool, |conn| {
            Box::pin(async move {
                let mut inserted = Vec::with_capacity(rows.len());
                for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
                    inserted.extend(Measurement::insert_batch(chunk, conn).await?);
                }
                Ok::<_, diesel::result::Error>(inserted)
            })
        })
        .await
        .map_err(store_error)?;

        Ok(inserted.into_iter().map(Measurement::into_reading).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn query_range(
        &self,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, StoreError> {
        let rows = with_connection(self.read_pool(), |mut conn| async move {
            Measurement::find_in_range(device_id, start, end, &mut conn).await
        })
        .await
        .map_err(store_error)?;

        Ok(rows.into_iter().map(Measurement::into_reading).collect())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        with_connection(&self.pool, |mut conn| async move {
            Measurement::count(&mut conn).await
        })
        .await
        .map_err(store_error)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        use diesel_async::RunQueryDsl;

        with_connection(self.read_pool(), |mut conn| async move {
            diesel::sql_query("SELECT 1").execute(&mut conn).await
        })
        .await
        .map(|_| ())
        .map_err(store_error)
    }

    async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        let results = futures::future::join_all(
            self.pools()
                .into_iter()
                .map(|pool| shutdown_pool_with_timeout(pool.clone(), timeout)),
        )
        .await;

        results
            .into_iter()
            .collect::<Result<Vec<()>, String>>()
            .map(|_| ())
            .map_err(StoreError::Unavailable)
    }
}
