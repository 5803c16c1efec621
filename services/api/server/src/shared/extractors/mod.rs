pub mod payload;
pub mod query;
pub mod request_id;

use axum::http::HeaderMap;
use uuid::Uuid;

/// `x-request-id` when it holds a UUID, a fresh v4 otherwise.
pub(crate) fn request_id_from_headers(headers: &HeaderMap) -> Uuid {
    headers
        .get("x-request-id")
        .and_then(|header| header.to_str().ok())
        .and_then(|header_str| Uuid::parse_str(header_str).ok())
        .unwrap_or_else(Uuid::new_v4)
}
