use axum::{routing::get, Router, middleware};
use crate::state::AppState;
use crate::handlers::audit::list_audit;
use crate::handlers::report::get_kpis;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/kpis", get(get_kpis))
        .route("/audit", get(list_audit))
        .layer(middleware::from_fn(require_auth))
}
