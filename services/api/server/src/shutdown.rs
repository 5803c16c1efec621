use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use measurement_core::MeasurementStore;
use tokio::signal;
use tokio::sync::{Mutex, Notify};
use tokio::time::Duration;
use tracing::{error, info, warn};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ShutdownCoordinator {
    notify: Arc<Notify>,
    shutting_down: AtomicBool,
    inner: Mutex<Option<ShutdownInner>>,
}

struct ShutdownInner {
    store: Arc<dyn MeasurementStore>,
    redis_pool: Option<redis_cache::connection::Pool>,
}

impl ShutdownCoordinator {
    pub fn new(
        store: Arc<dyn MeasurementStore>,
        redis_pool: Option<redis_cache::connection::Pool>,
    ) -> Self {
        Self {
            notify: Arc::new(Notify::new()),
            shutting_down: AtomicBool::new(false),
            inner: Mutex::new(Some(ShutdownInner { store, redis_pool })),
        }
    }

    pub async fn wait_for_shutdown(&self) {
        self.notify.notified().await;
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Relaxed)
    }

    /// Marks the service as shutting down and drains the store and cache
    /// pools concurrently. Only the first call does any work.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Relaxed);
        info!("Initiating graceful shutdown sequence");

        let inner = match self.inner.lock().await.take() {
            Some(inner) => inner,
            None => {
                warn!("Shutdown already called");
                return;
            }
        };

        self.notify.notify_waiters();

        let store_handle = tokio::spawn({
            let store = inner.store.clone();
            async move {
                match tokio::time::timeout(
                    SHUTDOWN_TIMEOUT,
                    store.shutdown(SHUTDOWN_TIMEOUT),
                )
                .await
                {
                    Ok(Ok(())) => info!("Measurement store shutdown completed"),
                    Ok(Err(e)) => warn!("Measurement store shutdown error: {e}"),
                    Err(_) => warn!("Measurement store shutdown timed out"),
                }
            }
        });

        let redis_handle = tokio::spawn({
            let pool = inner.redis_pool.clone();
            async move {
                let Some(pool) = pool else {
                    return;
                };
                match tokio::time::timeout(
                    SHUTDOWN_TIMEOUT,
                    redis_cache::connection::shutdown_pool_with_timeout(
                        pool,
                        SHUTDOWN_TIMEOUT,
                    ),
                )
                .await
                {
                    Ok(_) => info!("Redis pool shutdown completed"),
                    Err(_) => warn!("Redis pool shutdown timed out"),
                }
            }
        });

        let _ = tokio::join!(store_handle, redis_handle);

        info!("Graceful shutdown sequence complete");
    }
}

pub async fn listen_for_shutdown_signals() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("signal received, starting graceful shutdown");
}
