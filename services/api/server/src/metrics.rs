use async_trait::async_trait;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};
use telemetry::metrics::TelemetryMetrics;

#[derive(Clone, Debug)]
pub struct ServerMetrics {
    pub registry: Registry,

    pub request_errors: IntCounterVec,
    pub measurements_ingested: IntCounter,
    pub query_duration: HistogramVec,
}

#[async_trait]
impl TelemetryMetrics for ServerMetrics {
    fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl ServerMetrics {
    pub fn new(prefix: Option<String>) -> anyhow::Result<Self> {
        let registry = Registry::new_custom(prefix, None)?;

        let request_errors = IntCounterVec::new(
            Opts::new(
                "request_errors",
                "A metric counting request errors by handler and error code",
            ),
            &["handler", "error_code"],
        )?;
        registry.register(Box::new(request_errors.clone()))?;

        let measurements_ingested = IntCounter::new(
            "measurements_ingested_total",
            "Readings stored through the ingest endpoint",
        )?;
        registry.register(Box::new(measurements_ingested.clone()))?;

        let query_duration = HistogramVec::new(
            HistogramOpts::new(
                "measurement_query_duration_seconds",
                "Time spent answering measurement queries, cache hits included",
            ),
            &["resolution"],
        )?;
        registry.register(Box::new(query_duration.clone()))?;

        Ok(Self {
            registry,
            request_errors,
            measurements_ingested,
            query_duration,
        })
    }

    pub fn record_error(&self, handler: &str, error_code: &str) {
        self.request_errors
            .with_label_values(&[handler, error_code])
            .inc();
    }

    pub fn record_ingested(&self, count: usize) {
        self.measurements_ingested.inc_by(count as u64);
    }

    pub fn observe_query(&self, resolution: &str, seconds: f64) {
        self.query_duration
            .with_label_values(&[resolution])
            .observe(seconds);
    }
}
