use axum::{
    routing::{get, post},
    Router, middleware,
};
use crate::state::AppState;
use crate::handlers::gate::{
    exit_truck, hold_for_approval, lookup_truck, mark_exit_ready, reject_truck, verify_truck,
};
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/gate/lookup", get(lookup_truck))
        .route("/gate/trucks/{id}/verify", post(verify_truck))
        .route("/gate/trucks/{id}/reject", post(reject_truck))
        .route("/gate/trucks/{id}/hold", post(hold_for_approval))
        .route("/gate/trucks/{id}/exit-ready", post(mark_exit_ready))
        .route("/gate/trucks/{id}/exit", post(exit_truck))
        .layer(middleware::from_fn(require_auth))
}
