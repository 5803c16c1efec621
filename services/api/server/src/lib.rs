//! # Measurement API Server
//!
//! HTTP surface of the energy measurements service: batch ingest and
//! per-device range queries, plus the operational routes the binary mounts
//! around them.
use crate::metrics::ServerMetrics;
use crate::shared::cache::MeasurementCache;
use crate::shutdown::ShutdownCoordinator;
use anyhow::Context;
use measurement_core::MeasurementService;
use postgres_models::connection::{
    Credentials, DEFAULT_DATABASE_NAME, DEFAULT_PORT, DatabaseConfig,
};
use std::sync::Arc;
use telemetry::metrics::Telemetry;

mod api;
pub mod data_loader;
pub mod health;
pub mod metrics;
pub mod openapi;
pub mod shared;
pub mod shutdown;

// Route registration is the only public entry into the API modules.
pub use api::fallback_handler;
pub use api::v1::get_routes as get_api_v1_routes;
pub use api::{ApiV1Detail, ApiV1Error};

/// Swagger UI plus the OpenAPI document in 3.0 (`/api-docs/openapi.json`)
/// and native 3.1 (`/api-docs/openapi-3.1.json`) form.
pub fn get_openapi_routes() -> axum::Router {
    use axum::Json;
    use axum::routing::get;
    use utoipa_swagger_ui::SwaggerUi;

    async fn openapi_3_0_handler() -> Json<serde_json::Value> {
        Json(openapi::MeasurementsApiDoc::openapi_json())
    }

    axum::Router::new()
        .without_v07_checks()
        .route("/api-docs/openapi.json", get(openapi_3_0_handler))
        .merge(SwaggerUi::new("/swagger-ui").url(
            "/api-docs/openapi-3.1.json",
            openapi::MeasurementsApiDoc::openapi(),
        ))
}

#[derive(Clone)]
pub struct AppState {
    pub telemetry: Arc<Telemetry<ServerMetrics>>,
    pub service: MeasurementService,
    /// Absent when no Redis is configured; queries then always hit the store.
    pub cache: Option<MeasurementCache>,
    pub shutdown: Arc<ShutdownCoordinator>,
}

// Lets extractors count their rejections.
impl axum::extract::FromRef<AppState> for Arc<Telemetry<ServerMetrics>> {
    fn from_ref(state: &AppState) -> Self {
        state.telemetry.clone()
    }
}

fn default_rust_log() -> String {
    "info".to_string()
}

fn default_database_port() -> u16 {
    DEFAULT_PORT
}

fn default_database_name() -> String {
    DEFAULT_DATABASE_NAME.to_string()
}

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    // Service port
    pub api_service_port: String,

    // Loggers
    #[serde(default = "default_rust_log")]
    pub rust_log: String,
    #[serde(default)]
    pub log_format: String,

    // Db configs, the in-memory store is used without an rw endpoint
    pub database_credentials: Option<String>,
    pub database_rw_endpoint: Option<String>,
    pub database_ro_endpoint: Option<String>,
    #[serde(default = "default_database_port")]
    pub database_port: u16,
    #[serde(default = "default_database_name")]
    pub database_name: String,

    // Redis configs
    pub redis_url: Option<String>,

    // JSON array of readings imported into an empty store
    pub measurements_seed_file_path: Option<String>,

    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        // Load .env file if present (useful when running outside docker-compose)
        match dotenv::dotenv() {
            Ok(path) => eprintln!("Loaded .env from: {}", path.display()),
            Err(e) => eprintln!("dotenv warning: {e}"),
        }

        envy::from_env::<Config>()
    }

    /// `None` when no read-write endpoint is configured.
    pub fn database_config(&self) -> anyhow::Result<Option<DatabaseConfig>> {
        let Some(rw_endpoint) = &self.database_rw_endpoint else {
            return Ok(None);
        };

        let raw_credentials = self.database_credentials.as_deref().context(
            "DATABASE_CREDENTIALS is required when DATABASE_RW_ENDPOINT is set",
        )?;
        let credentials = Credentials::from_json(raw_credentials)
            .context("DATABASE_CREDENTIALS must be JSON with username and password")?;

        let mut config = DatabaseConfig::new(credentials, rw_endpoint.clone());
        config.ro_endpoint = self.database_ro_endpoint.clone();
        config.port = self.database_port;
        config.database_name = self.database_name.clone();

        Ok(Some(config))
    }
}
