use measurement_core::{MeasurementError, StoreError, ValidationError};
use uuid::Uuid;

use crate::api::api_error_v1::{ApiV1Detail, ApiV1Error};
use crate::api::error_recorder::IntoApiV1Error;

pub type HandlerResult<T> = Result<T, ApiV1Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid measurement batch: {0}")]
    Validation(ValidationError),

    #[error("Measurement store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Measurement insert failed: {0}")]
    StoreInsert(String),
}

impl From<MeasurementError> for Error {
    fn from(err: MeasurementError) -> Self {
        match err {
            MeasurementError::Validation(e) => Error::Validation(e),
            // Ingest never parses a resolution.
            MeasurementError::UnsupportedResolution(e) => {
                Error::Validation(ValidationError::field("resolution", e.to_string()))
            }
            MeasurementError::Store(StoreError::Unavailable(e)) => {
                Error::StoreUnavailable(e)
            }
            MeasurementError::Store(StoreError::Query(e)) => Error::StoreInsert(e),
        }
    }
}

impl IntoApiV1Error for Error {
    fn error_code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::StoreInsert(_) => "store_error",
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
                    "Fix the entry and resend the whole batch",
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
            Error::StoreInsert(e) => ApiV1Error::internal_server_error(
                "Failed to store measurements".to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validation_detail_points_at_entry() {
        let err = Error::from(MeasurementError::from(ValidationError::entry(
            2,
            "timestamp",
            "`later` is not a valid date",
        )))
        .into_api_v1_error(&Uuid::nil());

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.details[0].field.as_deref(), Some("[2].timestamp"));
        assert_eq!(err.details[0].message, "`later` is not a valid date");
    }

    #[test]
    fn test_store_errors() {
        let unavailable = Error::from(MeasurementError::from(
            StoreError::Unavailable("pool timed out".to_string()),
        ));
        assert_eq!(unavailable.error_code(), "store_unavailable");
        assert_eq!(
            unavailable.into_api_v1_error(&Uuid::nil()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let failed = Error::from(MeasurementError::from(StoreError::Query(
            "duplicate key".to_string(),
        )));
        assert_eq!(
            failed.into_api_v1_error(&Uuid::nil()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
