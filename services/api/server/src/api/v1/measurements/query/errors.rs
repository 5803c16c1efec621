use measurement_core::{
    MeasurementError, StoreError, UnsupportedResolutionError, ValidationError,
};
use uuid::Uuid;

use crate::api::api_error_v1::{ApiV1Detail, ApiV1Error};
use crate::api::error_recorder::IntoApiV1Error;

pub type HandlerResult<T> = Result<T, ApiV1Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid query: {0}")]
    Validation(ValidationError),

    #[error(transparent)]
    UnsupportedResolution(UnsupportedResolutionError),

    #[error("Measurement store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Measurement query failed: {0}")]
    StoreQuery(String),
}

impl From<MeasurementError> for Error {
    fn from(err: MeasurementError) -> Self {
        match err {
            MeasurementError::Validation(e) => Error::Validation(e),
            MeasurementError::UnsupportedResolution(e) => {
                Error::UnsupportedResolution(e)
            }
            MeasurementError::Store(StoreError::Unavailable(e)) => {
                Error::StoreUnavailable(e)
            }
            MeasurementError::Store(StoreError::Query(e)) => Error::StoreQuery(e),
        }
    }
}

impl IntoApiV1Error for Error {
    fn error_code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::UnsupportedResolution(_) => "unsupported_resolution",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::StoreQuery(_) => "store_error",
        }
    }

    fn into_api_v1_error(self, request_id: &Uuid) -> ApiV1Error {
        let code = self.error_code();
        match self {
            Error::Validation(e) => ApiV1Error::bad_request(
                "Validation failed".to_string(),
                vec![ApiV1Detail::new(
                    Some(e.path()),
                    code,
                    e.message,
                    "Check the field value and format",
                )],
                request_id.to_string(),
            ),
            Error::UnsupportedResolution(e) => ApiV1Error::bad_request(
                "Validation failed".to_string(),
                vec![ApiV1Detail::new(
                    Some("resolution".to_string()),
                    code,
                    e.to_string(),
                    "Use one of: day, hour, raw",
                )],
                request_id.to_string(),
            ),
            Error::StoreUnavailable(e) => ApiV1Error::service_unavailable(
                "Service temporarily unavailable".to_string(),
                vec![ApiV1Detail::new(
                    None,
                    code,
                    format!("Measurement store unavailable: {e}"),
                    "Please try again later",
                )],
                request_id.to_string(),
            ),
            Error::StoreQuery(e) => ApiV1Error::internal_server_error(
                "Measurement query failed".to_string(),
                vec![ApiV1Detail::new(
                    None,
                    code,
                    format!("Store error: {e}"),
                    "Please try again later",
                )],
                request_id.to_string(),
            ),
        }
    }
}
