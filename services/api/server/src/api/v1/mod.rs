use axum::Router;

pub(crate) mod measurements;

pub fn get_routes(state: crate::AppState) -> Router {
    Router::new().merge(measurements::get_routes(state))
}
