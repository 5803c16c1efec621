use std::sync::Arc;

use telemetry::metrics::Telemetry;
use uuid::Uuid;

use crate::api::api_error_v1::ApiV1Error;
use crate::metrics::ServerMetrics;

/// Handler error types that can be rendered as an [`ApiV1Error`].
pub trait IntoApiV1Error {
    /// Stable code used as the `error_code` metric label.
    fn error_code(&self) -> &'static str;

    fn into_api_v1_error(self, request_id: &Uuid) -> ApiV1Error;
}

/// Counts handler failures in `request_errors` and converts them to the
/// error envelope.
pub struct ErrorRecorder<'a> {
    telemetry: &'a Arc<Telemetry<ServerMetrics>>,
    handler_name: &'a str,
    request_id: &'a Uuid,
}

impl<'a> ErrorRecorder<'a> {
    pub fn new(
        telemetry: &'a Arc<Telemetry<ServerMetrics>>,
        handler_name: &'a str,
        request_id: &'a Uuid,
    ) -> Self {
        Self {
            telemetry,
            handler_name,
            request_id,
        }
    }

    pub fn record<E: IntoApiV1Error + std::fmt::Display>(&self, e: E) -> ApiV1Error {
        let code = e.error_code();
        tracing::warn!(
            handler = self.handler_name,
            error_code = code,
            request_id = %self.request_id,
            "{e}"
        );
        self.telemetry.maybe_use_metrics(|m| {
            m.record_error(self.handler_name, code);
        });
        e.into_api_v1_error(self.request_id)
    }
}
