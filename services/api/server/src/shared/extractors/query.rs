use std::borrow::Cow;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{FromRef, FromRequestParts, Query};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use telemetry::metrics::Telemetry;
use uuid::Uuid;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use super::request_id_from_headers;
use crate::api::error_recorder::{ErrorRecorder, IntoApiV1Error};
use crate::api::{ApiV1Detail, ApiV1Error};
use crate::metrics::ServerMetrics;

/// `handler` label of query string rejections in `request_errors`.
pub const EXTRACTOR_NAME: &str = "validated_query";

/// Query string extractor that runs the `validator` rules of `T` and
/// rejects with the API error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    Arc<Telemetry<ServerMetrics>>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiV1Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let telemetry = Arc::<Telemetry<ServerMetrics>>::from_ref(state);
        let request_id = request_id_from_headers(&parts.headers);
        let recorder = ErrorRecorder::new(&telemetry, EXTRACTOR_NAME, &request_id);

        let Query(value) = Query::<T>::try_from_uri(&parts.uri)
            .map_err(|e| recorder.record(Error::Query(e)))?;

        value
            .validate()
            .map_err(|e| recorder.record(Error::Validation(e)))?;

        Ok(Self(value))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid query string: {0}")]
    Query(QueryRejection),

    #[error("Query validation failed: {0}")]
    Validation(ValidationErrors),
}

impl IntoApiV1Error for Error {
    fn error_code(&self) -> &'static str {
        match self {
            Error::Query(_) => "invalid_query",
            Error::Validation(_) => "validation_failed",
        }
    }

    fn into_api_v1_error(self, request_id: &Uuid) -> ApiV1Error {
        match self {
            Error::Query(e) => ApiV1Error::bad_request(
                "Invalid query string".to_string(),
                vec![ApiV1Detail::new(
                    Some("query".to_string()),
                    "invalid_query",
                    e.body_text(),
                    "Check the query parameters",
                )],
                request_id.to_string(),
            ),
            Error::Validation(e) => ApiV1Error::bad_request(
                "Validation failed".to_string(),
                validation_errors_to_details(&e),
                request_id.to_string(),
            ),
        }
    }
}

/// One detail per failed rule, sorted by field for stable output.
pub(crate) fn validation_errors_to_details(
    errors: &ValidationErrors,
) -> Vec<ApiV1Detail> {
    let mut details = Vec::new();
    collect_details(errors, None, &mut details);
    details.sort_by(|a, b| a.field.cmp(&b.field));

    if details.is_empty() {
        details.push(ApiV1Detail::new(
            Some("request".to_string()),
            "validation_failed",
            "Validation failed",
            "Check the request parameters",
        ));
    }

    details
}

fn collect_details(
    errors: &ValidationErrors,
    parent_path: Option<&str>,
    output: &mut Vec<ApiV1Detail>,
) {
    for (field, kind) in errors.errors() {
        let field = wire_field_name(field);
        let current_path = match parent_path {
            Some(p) => format!("{p}.{field}"),
            None => field,
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .clone()
                        .unwrap_or(Cow::Owned(error.code.to_string()));

                    output.push(ApiV1Detail::new(
                        Some(current_path.clone()),
                        error.code.to_string(),
                        message.to_string(),
                        "Check the field value and format",
                    ));
                }
            }
            ValidationErrorsKind::Struct(struct_errors) => {
                collect_details(struct_errors, Some(&current_path), output);
            }
            ValidationErrorsKind::List(list_errors) => {
                for (index, item_errors) in list_errors {
                    let item_path = format!("{current_path}[{index}]");
                    collect_details(item_errors, Some(&item_path), output);
                }
            }
        }
    }
}

/// validator reports Rust field names, the wire uses camelCase.
fn wire_field_name(field: &str) -> String {
    let mut name = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = !name.is_empty();
        } else if upper_next {
            name.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            name.push(c);
        }
    }
    name
}
