use axum::{
    routing::{get, post},
    Router, middleware,
};
use crate::state::AppState;
use crate::handlers::register::{
    create_entry, create_template, get_template, list_entries, list_templates, update_template,
};
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/registers", get(list_templates))
        .route("/registers", post(create_template))
        .route("/registers/{id}", get(get_template))
        .route("/registers/{id}", axum::routing::put(update_template))
        .route("/registers/{id}/entries", get(list_entries))
        .route("/registers/{id}/entries", post(create_entry))
        .layer(middleware::from_fn(require_auth))
}
