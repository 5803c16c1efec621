mod traits;

use std::sync::Arc;

pub use traits::TelemetryMetrics;

#[derive(Clone)]
pub struct Telemetry<M: TelemetryMetrics> {
    metrics: Option<Arc<M>>,
}

impl<M: TelemetryMetrics> Telemetry<M> {
    pub async fn new(metrics: Option<M>) -> anyhow::Result<Arc<Self>> {
        Ok(Arc::new(Self {
            metrics: metrics.map(Arc::new),
        }))
    }

    pub fn maybe_use_metrics<F>(&self, f: F)
    where
        F: Fn(&M),
    {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }

    /// Application registry first, then the default registry (process
    /// metrics), terminated by `# EOF`.
    pub async fn get_metrics(&self) -> String {
        use prometheus::Encoder;

        let Some(metrics) = &self.metrics else {
            return "# EOF\n".to_string();
        };

        let mut result = metrics.gather_metrics();

        let mut buffer = Vec::new();
        if let Err(e) = prometheus::TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
        {
            tracing::error!("could not encode prometheus metrics: {}", e);
        }

        match String::from_utf8(buffer) {
            Ok(v) => result.push_str(&v),
            Err(e) => {
                tracing::error!(
                    "prometheus metrics could not be from_utf8'd: {}",
                    e
                );
            }
        }

        result.push_str("# EOF\n");
        result
    }
}
