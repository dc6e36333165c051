use axum::{extract::State, Json};
use axum::extract::{Extension, Path, Query};
use serde_json::json;

use crate::audit::{self, Category};
use crate::dtos::approval::{ApprovalRequestResponse, ListApprovalsQuery, ResolveApprovalRequest};
use crate::error::AppError;
use crate::lifecycle::{ApprovalStatus, Milestone};
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

pub async fn list_approvals(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListApprovalsQuery>,
) -> Result<Json<Vec<ApprovalRequestResponse>>, AppError> {
    if !auth.has_role(&["supervisor"]) {
        return Err(AppError::forbidden("Only supervisors can view approval requests"));
    }
    if let Some(status) = &query.status {
        status.parse::<ApprovalStatus>()?;
    }
    if let Some(kind) = &query.kind {
        if kind != "gate_exception" && kind != "weighment" {
            return Err(AppError::validation("kind must be 'gate_exception' or 'weighment'"));
        }
    }

    let requests = sqlx::query_as::<_, ApprovalRequestResponse>(
        r#"SELECT * FROM approval_requests
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::TEXT IS NULL OR kind = $2)
        ORDER BY created_at DESC"#,
    )
    .bind(&query.status)
    .bind(&query.kind)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(requests))
}

/// Resolves one pending request and writes the outcome back into its
/// origin: the truck's approval status for gate exceptions, the entry
/// milestone for weighment holds. A request resolves at most once; the
/// `status = 'pending'` guard on the update makes a second resolve a 409.
pub async fn resolve_approval(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<ResolveApprovalRequest>,
) -> Result<Json<ApprovalRequestResponse>, AppError> {
    if !auth.has_role(&["supervisor"]) {
        return Err(AppError::forbidden("Only supervisors can resolve approval requests"));
    }

    let decision = match req.decision.as_str() {
        "approved" => ApprovalStatus::Approved,
        "rejected" => ApprovalStatus::Rejected,
        _ => return Err(AppError::validation("decision must be 'approved' or 'rejected'")),
    };

    let mut tx = db_pool.begin().await?;

    let resolved = sqlx::query_as::<_, ApprovalRequestResponse>(
        r#"UPDATE approval_requests SET
            status = $2, resolved_by = $3, resolved_at = now()
        WHERE id = $1 AND status = 'pending'
        RETURNING *"#,
    )
    .bind(id)
    .bind(decision.as_str())
    .bind(auth.user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let resolved = match resolved {
        Some(r) => r,
        None => {
            let exists = sqlx::query_as::<_, (bool,)>(
                r#"SELECT EXISTS(SELECT 1 FROM approval_requests WHERE id = $1)"#,
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            return Err(if exists.0 {
                AppError::conflict("Approval request is already resolved")
            } else {
                AppError::not_found("Approval request not found")
            });
        }
    };

    match resolved.kind.as_str() {
        "gate_exception" => {
            sqlx::query(
                r#"UPDATE trucks SET
                    approval_status = $2,
                    approval_reason = COALESCE($3, approval_reason),
                    updated_at = now()
                WHERE id = $1"#,
            )
            .bind(resolved.truck_id)
            .bind(decision.as_str())
            .bind(&req.reason)
            .execute(&mut *tx)
            .await?;
        }
        "weighment" => {
            if decision == ApprovalStatus::Approved {
                if let Some(entry_id) = resolved.weighbridge_entry_id {
                    sqlx::query(
                        r#"UPDATE weighbridge_entries SET milestone = $2
                        WHERE id = $1 AND milestone = $3"#,
                    )
                    .bind(entry_id)
                    .bind(Milestone::Weighed.as_str())
                    .bind(Milestone::PendingWeighing.as_str())
                    .execute(&mut *tx)
                    .await?;
                }
            }
            // A rejected weighment leaves the entry pending for a re-weigh.
        }
        other => {
            return Err(AppError::internal(format!("Unknown approval kind '{other}'")));
        }
    }

    audit::record(
        &mut tx,
        Category::Approval,
        Some(resolved.truck_id),
        &auth,
        if decision == ApprovalStatus::Approved { "Approved" } else { "Rejected" },
        json!({ "requestId": id, "kind": &resolved.kind, "reason": req.reason }),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(resolved))
}
