use async_trait::async_trait;
use prometheus::{Encoder, Registry, TextEncoder};

/// Application metrics that own a dedicated prometheus [`Registry`].
#[async_trait]
pub trait TelemetryMetrics: Send + Sync + Clone + 'static {
    fn registry(&self) -> &Registry;

    /// Renders the application registry in the text exposition format.
    fn gather_metrics(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) =
            TextEncoder::new().encode(&self.registry().gather(), &mut buffer)
        {
            tracing::error!("could not encode application metrics: {}", e);
            return String::default();
        }

        String::from_utf8(buffer).unwrap_or_else(|e| {
            tracing::error!("application metrics are not valid utf-8: {}", e);
            String::default()
        })
    }
}
