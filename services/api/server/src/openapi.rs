// The OpenApi derive macro generates code using Iterator::for_each,
// which is disallowed by our clippy config. Allow it at module level.
#![allow(clippy::disallowed_methods)]

use utoipa::OpenApi;

use crate::api::v1::measurements::{ingest, query};

#[derive(OpenApi)]
#[openapi(
    paths(
        ingest::handler::handler,
        query::handler::handler,
    ),
    components(schemas(
        crate::api::ApiV1Error,
        crate::api::ApiV1Detail,
        ingest::models::CreateMeasurementRequest,
        ingest::models::MeasurementResponse,
        query::models::MeasurementsResponse,
        query::models::MeasurementPoint,
        query::models::AccumulatedPoint,
        query::models::RawPoint,
    )),
    info(
        title = "Energy Measurements API",
        version = "1.0.0",
        description = "Ingest per-device energy readings and query them raw or summed per UTC hour or day",
        license(name = "Apache-2.0")
    ),
    servers(
        (url = "/api", description = "API v1")
    ),
    tags(
        (name = "measurements", description = "Measurement ingest and aggregation")
    )
)]
pub struct MeasurementsApiDoc;

impl MeasurementsApiDoc {
    pub fn openapi() -> utoipa::openapi::OpenApi {
        <MeasurementsApiDoc as utoipa::OpenApi>::openapi()
    }

    /// OpenAPI 3.0 flavour of the document: `type: ["array", "null"]`
    /// becomes `type: "array", nullable: true`.
    pub fn openapi_json() -> serde_json::Value {
        let mut json_value = match serde_json::to_value(Self::openapi()) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize OpenAPI spec: {e}");
                return serde_json::Value::Null;
            }
        };

        let fixed_count = Self::fix_nullable_arrays_recursive(&mut json_value);
        if fixed_count > 0 {
            tracing::info!(
                "Fixed {} nullable array type definitions in OpenAPI spec",
                fixed_count
            );
        }

        json_value
    }

    fn fix_nullable_arrays_recursive(value: &mut serde_json::Value) -> usize {
        let mut fixed_count = 0;

        match value {
            serde_json::Value::Object(map) => {
                if let Some(serde_json::Value::Array(type_array)) = map.get("type")
                {
                    let has_array = type_array.iter().any(|v| v == "array");
                    let has_null = type_array.iter().any(|v| v == "null");

                    if has_array && has_null && type_array.len() == 2 {
                        map.insert(
                            "type".to_string(),
                            serde_json::Value::String("array".to_string()),
                        );
                        map.insert(
                            "nullable".to_string(),
                            serde_json::Value::Bool(true),
                        );
                        fixed_count += 1;
                    }
                }

                for val in map.values_mut() {
                    fixed_count += Self::fix_nullable_arrays_recursive(val);
                }
            }
            serde_json::Value::Array(arr) => {
                for item in arr.iter_mut() {
                    fixed_count += Self::fix_nullable_arrays_recursive(item);
                }
            }
            _ => {}
        }

        fixed_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_documents_both_routes() {
        let json = MeasurementsApiDoc::openapi_json();
        let paths = json["paths"].as_object().unwrap();

        assert!(paths.contains_key("/measurements"));
        assert!(paths.contains_key("/device/{device_id}/measurements"));
    }

    #[test]
    fn test_license_matches_workspace() {
        let json = MeasurementsApiDoc::openapi_json();
        assert_eq!(json["info"]["license"]["name"], env!("CARGO_PKG_LICENSE"));
    }

    #[test]
    fn test_nullable_arrays_are_rewritten() {
        let mut value = json!({
            "properties": {
                "details": { "type": ["array", "null"] },
                "message": { "type": "string" }
            }
        });

        let fixed = MeasurementsApiDoc::fix_nullable_arrays_recursive(&mut value);

        assert_eq!(fixed, 1);
        assert_eq!(
            value["properties"]["details"],
            json!({ "type": "array", "nullable": true })
        );
    }
}
