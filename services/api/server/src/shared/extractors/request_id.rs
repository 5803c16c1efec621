use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use super::request_id_from_headers;

/// Request id echoed in error envelopes and logs.
///
/// Taken from the `x-request-id` header; a missing or non-UUID header gets a
/// new v4 id.
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(request_id_from_headers(&parts.headers)))
    }
}

impl std::ops::Deref for RequestId {
    type Target = Uuid;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_header_is_echoed() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-request-id",
            HeaderValue::from_str(&id.to_string()).unwrap(),
        );

        assert_eq!(request_id_from_headers(&headers), id);
    }

    #[test]
    fn test_invalid_header_gets_fresh_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("not-a-uuid"));

        let id = request_id_from_headers(&headers);
        assert_eq!(id.get_version_num(), 4);
    }
}
