use axum::{extract::State, Json};
use axum::extract::{Extension, Query};

use crate::dtos::audit::{AuditEntryResponse, ListAuditQuery};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const CATEGORIES: &[&str] = &["scheduling", "gate", "weighbridge", "dock", "approval"];
const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

/// Read side of the audit trail. There is no write endpoint; rows are
/// appended by the mutating handlers inside their own transactions.
pub async fn list_audit(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListAuditQuery>,
) -> Result<Json<Vec<AuditEntryResponse>>, AppError> {
    if !auth.has_role(&["supervisor"]) {
        return Err(AppError::forbidden("Only supervisors can read the audit log"));
    }
    if let Some(category) = &query.category {
        if !CATEGORIES.contains(&category.as_str()) {
            return Err(AppError::validation("Unknown audit category"));
        }
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let entries = sqlx::query_as::<_, AuditEntryResponse>(
        r#"SELECT id, category, truck_id, actor_id, actor_name, action, details, created_at
        FROM audit_log
        WHERE ($1::BIGINT IS NULL OR truck_id = $1)
          AND ($2::TEXT IS NULL OR category = $2)
        ORDER BY created_at DESC, id DESC
        LIMIT $3"#,
    )
    .bind(query.truck_id)
    .bind(&query.category)
    .bind(limit)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(entries))
}
