use axum::{
    routing::{get, post},
    Router, middleware,
};
use crate::state::AppState;
use crate::handlers::approval::{list_approvals, resolve_approval};
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approvals", get(list_approvals))
        .route("/approvals/{id}/resolve", post(resolve_approval))
        .layer(middleware::from_fn(require_auth))
}
