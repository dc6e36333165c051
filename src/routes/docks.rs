use axum::{
    routing::{get, post},
    Router, middleware,
};
use crate::state::AppState;
use crate::handlers::dock::{
    assign_truck, complete_operation, create_dock, list_docks, list_operations, update_dock,
};
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/docks", get(list_docks))
        .route("/docks", post(create_dock))
        .route("/docks/{id}", axum::routing::put(update_dock))
        .route("/docks/{id}/assign", post(assign_truck))
        .route("/dock-operations", get(list_operations))
        .route("/dock-operations/{id}/complete", post(complete_operation))
        .layer(middleware::from_fn(require_auth))
}
