use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error envelope returned by every `/api` route.
#[derive(Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1Error {
    #[serde(skip)]
    pub(crate) status_code: axum::http::StatusCode,
    pub(crate) message: String,
    pub(crate) details: Vec<ApiV1Detail>,
    pub(crate) timestamp: String,
    pub(crate) request_id: String,
}

impl ApiV1Error {
    fn with_status(
        status_code: axum::http::StatusCode,
        message: String,
        details: Vec<ApiV1Detail>,
        request_id: String,
    ) -> Self {
        Self {
            status_code,
            message,
            details,
            timestamp: Utc::now().to_rfc3339(),
            request_id,
        }
    }

    pub fn bad_request(
        message: String,
        details: Vec<ApiV1Detail>,
        request_id: String,
    ) -> Self {
        Self::with_status(
            axum::http::StatusCode::BAD_REQUEST,
            message,
            details,
            request_id,
        )
    }

    pub fn not_found(
        message: String,
        details: Vec<ApiV1Detail>,
        request_id: String,
    ) -> Self {
        Self::with_status(
            axum::http::StatusCode::NOT_FOUND,
            message,
            details,
            request_id,
        )
    }

    pub fn internal_server_error(
        message: String,
        details: Vec<ApiV1Detail>,
        request_id: String,
    ) -> Self {
        Self::with_status(
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            message,
            details,
            request_id,
        )
    }

    pub fn service_unavailable(
        message: String,
        details: Vec<ApiV1Detail>,
        request_id: String,
    ) -> Self {
        Self::with_status(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            message,
            details,
            request_id,
        )
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        self.status_code
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, ToSchema)]
#[serde(default)]
pub struct ApiV1Detail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) field: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) suggestion: String,
}

impl ApiV1Detail {
    pub fn new(
        field: Option<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            field,
            code: code.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

impl axum::response::IntoResponse for ApiV1Error {
    fn into_response(self) -> axum::response::Response {
        if self.status_code.is_server_error() {
            sentry::Hub::with_active(|hub| hub.capture_error(&self));
        }

        (self.status_code, axum::Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiV1Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}, {}, {}",
            self.status_code,
            self.message,
            self.request_id,
            self.details
                .iter()
                .map(|d| d.message.clone())
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

impl std::fmt::Debug for ApiV1Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiV1Error")
            .field("status_code", &self.status_code)
            .field("message", &self.message)
            .field("details", &self.details)
            .field("timestamp", &self.timestamp)
            .field("request_id", &self.request_id)
            .finish()
    }
}

impl std::error::Error for ApiV1Error {}
