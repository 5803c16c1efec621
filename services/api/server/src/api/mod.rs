pub(crate) mod api_error_v1;
pub(crate) mod error_recorder;
pub(crate) mod v1;

pub use api_error_v1::{ApiV1Detail, ApiV1Error};

use crate::shared::extractors::request_id::RequestId;

/// 404 envelope for every route that does not exist.
pub async fn fallback_handler(RequestId(request_id): RequestId) -> ApiV1Error {
    ApiV1Error::not_found(
        "The requested endpoint does not exist".to_string(),
        vec![ApiV1Detail::new(
            None,
            "route_not_found",
            "No route matches the request path and method",
            "Check the API reference at /swagger-ui",
        )],
        request_id.to_string(),
    )
}
