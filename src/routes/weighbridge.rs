use axum::{
    routing::{get, post},
    Router, middleware,
};
use crate::state::AppState;
use crate::handlers::weighbridge::{get_entry, list_entries, record_weight, route_entry};
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/weighbridge/entries", get(list_entries))
        .route("/weighbridge/entries/{id}", get(get_entry))
        .route("/weighbridge/entries/{id}/weigh", post(record_weight))
        .route("/weighbridge/entries/{id}/route", post(route_entry))
        .layer(middleware::from_fn(require_auth))
}
