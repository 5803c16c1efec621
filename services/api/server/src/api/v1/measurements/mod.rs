use axum::Router;

pub mod ingest;
pub mod query;

pub fn get_routes(state: crate::AppState) -> Router {
    Router::new()
        .route("/measurements", axum::routing::post(ingest::handler::handler))
        .route(
            "/device/{device_id}/measurements",
            axum::routing::get(query::handler::handler),
        )
        .with_state(state)
}
