use std::sync::Arc;

use axum::extract::rejection::BytesRejection;
use axum::extract::{FromRef, FromRequest, Request};
use axum::http::{HeaderMap, header};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use telemetry::metrics::Telemetry;
use thiserror::Error;
use uuid::Uuid;

use super::request_id_from_headers;
use crate::api::error_recorder::{ErrorRecorder, IntoApiV1Error};
use crate::api::{ApiV1Detail, ApiV1Error};
use crate::metrics::ServerMetrics;

/// `handler` label of body rejections in `request_errors`.
pub const EXTRACTOR_NAME: &str = "payload";

/// JSON body extractor that reports the JSON path of the first bad value.
///
/// Uses the full request body and therefore must come after the extractors
/// that only read request parts.
#[derive(Debug, Clone, Copy, Default)]
#[must_use]
pub struct Payload<T>(pub T);

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    Arc<Telemetry<ServerMetrics>>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiV1Error;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let telemetry = Arc::<Telemetry<ServerMetrics>>::from_ref(state);
        let request_id = request_id_from_headers(req.headers());
        let recorder = ErrorRecorder::new(&telemetry, EXTRACTOR_NAME, &request_id);

        if !json_content_type(req.headers()) {
            return Err(recorder.record(Error::MissingJsonContentType));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| recorder.record(Error::from(e)))?;
        let deserializer = &mut serde_json::Deserializer::from_slice(&bytes);
        let value: T = serde_path_to_error::deserialize(deserializer)
            .map_err(|e| recorder.record(Error::from(e)))?;

        Ok(Payload(value))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Bytes(#[from] BytesRejection),

    #[error(transparent)]
    Json(#[from] serde_path_to_error::Error<serde_json::Error>),

    #[error("missing content-type header")]
    MissingJsonContentType,
}

impl IntoApiV1Error for Error {
    fn error_code(&self) -> &'static str {
        match self {
            Error::Bytes(_) => "request_body_error",
            Error::Json(_) => "invalid_payload",
            Error::MissingJsonContentType => "missing_content_type",
        }
    }

    fn into_api_v1_error(self, request_id: &Uuid) -> ApiV1Error {
        let request_id = request_id.to_string();

        match self {
            Error::Json(serde_err) => {
                let field_path = serde_err.path().to_string();
                let inner_message = serde_err.inner().to_string();

                let (field, message, code) = if field_path.is_empty()
                    || field_path == "."
                {
                    (
                        "request".to_string(),
                        format!("Invalid JSON: {inner_message}"),
                        "invalid_json",
                    )
                } else {
                    let field_name =
                        extract_nested_field_name(&field_path, &inner_message);
                    let message = if inner_message.contains("missing field") {
                        format!("Missing required field: {field_name}")
                    } else {
                        format!(
                            "Invalid value for field '{field_name}': {inner_message}"
                        )
                    };
                    (field_name, message, "invalid_field")
                };

                ApiV1Error::bad_request(
                    "Invalid request payload".to_string(),
                    vec![ApiV1Detail::new(
                        Some(field),
                        code,
                        message,
                        "Check the field value and format",
                    )],
                    request_id,
                )
            }
            Error::MissingJsonContentType => ApiV1Error::bad_request(
                "Missing content-type header".to_string(),
                vec![ApiV1Detail::new(
                    Some("Content-Type".to_string()),
                    "missing_content_type",
                    "Content-Type header must be application/json",
                    "Set Content-Type header to application/json",
                )],
                request_id,
            ),
            Error::Bytes(_) => ApiV1Error::bad_request(
                "Request body error".to_string(),
                vec![ApiV1Detail::new(
                    Some("request".to_string()),
                    "request_body_error",
                    "Unable to read request body",
                    "Check the request body and content length",
                )],
                request_id,
            ),
        }
    }
}

/// `[2]` + "missing field `timestamp`" gives `[2].timestamp`.
fn extract_nested_field_name(field_path: &str, inner_message: &str) -> String {
    match extract_missing_field_from_message(inner_message) {
        Some(missing_field) if field_path.is_empty() || field_path == "." => {
            missing_field
        }
        Some(missing_field) => format!("{field_path}.{missing_field}"),
        None => field_path.to_string(),
    }
}

/// "missing field `appName`" -> Some("appName")
fn extract_missing_field_from_message(message: &str) -> Option<String> {
    let start = message.find("missing field")?;
    let after_missing = &message[start + "missing field".len()..];

    let backtick_start = after_missing.find('`')?;
    let backtick_end = after_missing[backtick_start + 1..].find('`')?;

    Some(
        after_missing[backtick_start + 1..backtick_start + 1 + backtick_end]
            .to_string(),
    )
}

fn json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE) else {
        return false;
    };

    let Ok(content_type) = content_type.to_str() else {
        return false;
    };

    let Ok(mime) = content_type.parse::<mime::Mime>() else {
        return false;
    };

    mime.type_() == "application"
        && (mime.subtype() == "json"
            || mime.suffix().is_some_and(|name| name == "json"))
}
