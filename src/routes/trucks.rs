use axum::{
    routing::{get, post},
    Router, middleware,
};
use crate::state::AppState;
use crate::handlers::truck::{
    cancel_truck, create_truck, get_gate_pass, get_truck, list_trucks, reschedule_truck,
    update_truck,
};
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trucks", get(list_trucks))
        .route("/trucks", post(create_truck))
        .route("/trucks/{id}", get(get_truck))
        .route("/trucks/{id}", axum::routing::put(update_truck))
        .route("/trucks/{id}/cancel", post(cancel_truck))
        .route("/trucks/{id}/reschedule", post(reschedule_truck))
        .route("/trucks/{id}/gate-pass", get(get_gate_pass))
        .layer(middleware::from_fn(require_auth))
}
