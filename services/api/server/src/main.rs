use anyhow::Context;
use measurement_api::metrics::ServerMetrics;
use measurement_api::shared::cache::MeasurementCache;
use measurement_api::shutdown::{ShutdownCoordinator, listen_for_shutdown_signals};
use measurement_core::{InMemoryMeasurementStore, MeasurementService, MeasurementStore};
use postgres_models::PgMeasurementStore;
use std::sync::Arc;
use telemetry::metrics::Telemetry;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer,
    trace::TraceLayer,
};

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;

const VERSION: Option<&'static str> = option_env!("VERSION");
const MIGRATIONS: diesel_migrations::EmbeddedMigrations =
    diesel_migrations::embed_migrations!("./../../../db/migrations");

fn main() {
    let version = VERSION.unwrap_or("unknown").to_string();
    let config = match measurement_api::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    // Keeps the Sentry client alive until the process exits.
    let _sentry_guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: Some(version.clone().into()),
                ..Default::default()
            },
        ))
    });

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to build tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        if let Err(e) = setup(config, version).await {
            tracing::error!("Fatal error during setup: {e:#}");
            std::process::exit(1);
        }
    });
}

fn init_tracing(config: &measurement_api::Config) -> anyhow::Result<()> {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.rust_log))
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize tracing filter")?;

    let use_json = config.log_format != "pretty";

    if use_json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_timer(UtcTime::rfc_3339())
            .with_target(true)
            .with_level(true)
            .json();
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
            .pretty();
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    };

    Ok(())
}

async fn connect_store(
    config: &measurement_api::Config,
) -> anyhow::Result<Arc<dyn MeasurementStore>> {
    let Some(db_config) = config.database_config()? else {
        tracing::warn!(
            "DATABASE_RW_ENDPOINT is not set, using the in-memory measurement store"
        );
        return Ok(Arc::new(InMemoryMeasurementStore::new()));
    };

    let store = PgMeasurementStore::connect(&db_config).await?;

    let db_pool_conn = store
        .pool()
        .get_owned()
        .await
        .context("Failed to get connection from pool for migrations")?;

    postgres_models::connection::run_migrations(db_pool_conn, MIGRATIONS)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Failed to run database migrations")?;

    Ok(Arc::new(store))
}

async fn setup(
    config: measurement_api::Config,
    version: String,
) -> anyhow::Result<()> {
    init_tracing(&config)?;

    let addr: String = format!("0.0.0.0:{}", config.api_service_port);
    tracing::info!(version = %version, "Starting measurement-api service at: {addr}");

    let store = connect_store(&config).await?;
    let service = MeasurementService::new(store.clone());

    if let Some(seed_path) = &config.measurements_seed_file_path {
        measurement_api::data_loader::load_measurements(seed_path, &service)
            .await
            .context("Failed to load seed measurements")?;
    }

    let redis_pool = match &config.redis_url {
        Some(redis_url) => Some(
            redis_cache::connection::establish_connection(redis_url.clone())
                .await
                .context("Failed to connect to Redis")?,
        ),
        None => {
            tracing::info!("REDIS_URL is not set, query responses are not cached");
            None
        }
    };

    let shutdown =
        Arc::new(ShutdownCoordinator::new(store, redis_pool.clone()));

    let metrics = ServerMetrics::new(Some("measurement_api".to_string()))
        .context("Failed to create server metrics")?;
    let telemetry = Telemetry::new(Some(metrics))
        .await
        .context("Failed to create telemetry")?;
    tracing::info!("Initialized telemetry");

    let app_state = measurement_api::AppState {
        telemetry,
        service,
        cache: redis_pool.map(MeasurementCache::new),
        shutdown: shutdown.clone(),
    };
    let app = axum::Router::new()
        .without_v07_checks()
        .route("/health", {
            let state = app_state.clone();
            axum::routing::get(move || {
                let state = state.clone();
                async move { measurement_api::health::handler(state).await }
            })
        })
        .route(
            "/version",
            axum::routing::get(|| async { VERSION.unwrap_or("unknown") }),
        )
        .route("/metrics", {
            let telemetry = app_state.telemetry.clone();
            axum::routing::get(move || {
                let telemetry = telemetry.clone();
                async move {
                    (
                        axum::http::StatusCode::OK,
                        [(
                            axum::http::header::CONTENT_TYPE,
                            "text/plain; charset=utf-8",
                        )],
                        telemetry.get_metrics().await,
                    )
                }
            })
        })
        .nest("/api", measurement_api::get_api_v1_routes(app_state.clone()))
        .fallback(measurement_api::fallback_handler)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CatchPanicLayer::new())
        .merge(measurement_api::get_openapi_routes());

    let shutdown_handle = shutdown.clone();
    tokio::spawn(async move {
        listen_for_shutdown_signals().await;
        shutdown_handle.shutdown().await;
    });

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    let shutdown_for_serve = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_for_serve.wait_for_shutdown().await
        })
        .await
        .context("Server exited with error")?;

    Ok(())
}
