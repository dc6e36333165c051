use axum::{extract::State, Json};
use axum::extract::{Extension, Path, Query};
use serde_json::json;
use sqlx::{PgConnection, Postgres, Transaction};

use crate::audit::{self, Category};
use crate::auth::jwt::verify_gate_pass;
use crate::dtos::gate::{
    GateLookupQuery, GateLookupResponse, HoldForApprovalRequest, RejectTruckRequest,
    VerifyTruckRequest,
};
use crate::dtos::truck::TruckResponse;
use crate::error::AppError;
use crate::lifecycle::{
    allowed_events, transition, ApprovalStatus, Milestone, OperationKind, TruckEvent, TruckStatus,
    YardLocation,
};
use crate::middleware::auth::AuthContext;
use crate::models::truck::TruckRow;
use crate::state::AppState;

async fn fetch_truck_for_update(
    tx: &mut PgConnection,
    id: i64,
) -> Result<TruckRow, AppError> {
    sqlx::query_as::<_, TruckRow>(r#"SELECT * FROM trucks WHERE id = $1 FOR UPDATE"#)
        .bind(id)
        .fetch_optional(tx)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))
}

/// Gate lookup by raw id or scanned QR token. Returns the truck plus the
/// events currently legal for it, so the gate screen enables exactly the
/// actions the transition table allows.
pub async fn lookup_truck(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<GateLookupQuery>,
) -> Result<Json<GateLookupResponse>, AppError> {
    if !auth.has_role(&["gate_guard", "supervisor"]) {
        return Err(AppError::forbidden("Only gate guards can look up trucks"));
    }

    let truck_id = match (query.truck_id, query.token.as_deref()) {
        (Some(id), _) => id,
        (None, Some(token)) => {
            let secret = std::env::var("JWT_SECRET")
                .map_err(|_| AppError::internal("JWT secret not configured"))?;
            verify_gate_pass(token, &secret)?.sub
        }
        (None, None) => return Err(AppError::validation("Provide truck_id or token")),
    };

    let truck = sqlx::query_as::<_, TruckRow>(r#"SELECT * FROM trucks WHERE id = $1"#)
        .bind(truck_id)
        .fetch_optional(&db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))?;

    let events = allowed_events(truck.status()?, truck.approval());

    Ok(Json(GateLookupResponse { truck: truck.into(), allowed_events: events }))
}

/// Verification and location assignment are one action: the truck passes
/// the checklist (or carries an approved exception) and lands directly in
/// its `at_*` status. The derived row for the chosen location and the
/// audit entry commit in the same transaction.
pub async fn verify_truck(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<VerifyTruckRequest>,
) -> Result<Json<TruckResponse>, AppError> {
    if !auth.has_role(&["gate_guard"]) {
        return Err(AppError::forbidden("Only gate guards can verify trucks"));
    }

    let mut tx = db_pool.begin().await?;
    let truck = fetch_truck_for_update(&mut tx, id).await?;

    let current = truck.status()?;
    let approval = truck.approval();
    let exception = current == TruckStatus::PendingApproval;

    let next = transition(current, TruckEvent::Verify { location: req.location }, approval)?;

    // Normal path: the three required checks gate verification. The
    // exception path already cleared supervisor review.
    if !exception && !req.checks.required_ok() {
        return Err(AppError::validation(format!(
            "Required checks failed: {}",
            req.checks.failed_required().join(", ")
        )));
    }

    let dock_id = match req.location {
        YardLocation::Dock => {
            let dock_id = req
                .dock_id
                .ok_or_else(|| AppError::validation("dock_id is required for dock assignment"))?;
            let kind = req.operation_kind.ok_or_else(|| {
                AppError::validation("operation_kind is required for dock assignment")
            })?;
            claim_dock(&mut tx, dock_id, id, kind, &auth).await?;
            Some(dock_id)
        }
        YardLocation::Weighbridge => {
            sqlx::query(
                r#"INSERT INTO weighbridge_entries (truck_id, milestone) VALUES ($1, $2)"#,
            )
            .bind(id)
            .bind(Milestone::PendingWeighing.as_str())
            .execute(&mut *tx)
            .await?;
            None
        }
        YardLocation::Parking => None,
    };

    let updated = sqlx::query_as::<_, TruckRow>(
        r#"UPDATE trucks SET status = $2, current_dock_id = $3, updated_at = now()
        WHERE id = $1 RETURNING *"#,
    )
    .bind(id)
    .bind(next.as_str())
    .bind(dock_id)
    .fetch_one(&mut *tx)
    .await?;

    audit::record(
        &mut tx,
        Category::Gate,
        Some(id),
        &auth,
        "Verified",
        json!({
            "location": req.location,
            "checks": req.checks,
            "withException": exception,
            "dockId": dock_id,
        }),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(updated.into()))
}

pub async fn reject_truck(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<RejectTruckRequest>,
) -> Result<Json<TruckResponse>, AppError> {
    if !auth.has_role(&["gate_guard"]) {
        return Err(AppError::forbidden("Only gate guards can reject trucks"));
    }
    if req.reason.trim().is_empty() {
        return Err(AppError::validation("Rejection reason is required"));
    }

    let mut tx = db_pool.begin().await?;
    let truck = fetch_truck_for_update(&mut tx, id).await?;

    let next = transition(truck.status()?, TruckEvent::Reject, truck.approval())?;

    let updated = sqlx::query_as::<_, TruckRow>(
        r#"UPDATE trucks SET status = $2, approval_reason = $3, updated_at = now()
        WHERE id = $1 RETURNING *"#,
    )
    .bind(id)
    .bind(next.as_str())
    .bind(req.reason.trim())
    .fetch_one(&mut *tx)
    .await?;

    audit::record(
        &mut tx,
        Category::Gate,
        Some(id),
        &auth,
        "Rejected",
        json!({ "reason": req.reason.trim() }),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(updated.into()))
}

/// Failed required checks send the truck to `pending-approval` and open a
/// gate-exception approval request in the same transaction.
pub async fn hold_for_approval(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<HoldForApprovalRequest>,
) -> Result<Json<TruckResponse>, AppError> {
    if !auth.has_role(&["gate_guard"]) {
        return Err(AppError::forbidden("Only gate guards can request exceptions"));
    }

    let failed = req.checks.failed_required();
    if failed.is_empty() {
        return Err(AppError::validation(
            "All required checks passed; verify the truck instead",
        ));
    }

    let mut tx = db_pool.begin().await?;
    let truck = fetch_truck_for_update(&mut tx, id).await?;

    let next = transition(truck.status()?, TruckEvent::HoldForApproval, truck.approval())?;

    let updated = sqlx::query_as::<_, TruckRow>(
        r#"UPDATE trucks SET
            status = $2,
            approval_status = $3,
            failed_checks = $4,
            approval_reason = $5,
            updated_at = now()
        WHERE id = $1 RETURNING *"#,
    )
    .bind(id)
    .bind(next.as_str())
    .bind(ApprovalStatus::Pending.as_str())
    .bind(json!(&failed))
    .bind(&req.reason)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"INSERT INTO approval_requests (kind, status, truck_id, reason, data, requested_by)
        VALUES ('gate_exception', 'pending', $1, $2, $3, $4)"#,
    )
    .bind(id)
    .bind(&req.reason)
    .bind(json!({ "failedChecks": &failed, "checks": req.checks }))
    .bind(auth.user_id)
    .execute(&mut *tx)
    .await?;

    audit::record(
        &mut tx,
        Category::Gate,
        Some(id),
        &auth,
        "Held For Approval",
        json!({ "failedChecks": &failed, "reason": req.reason }),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(updated.into()))
}

pub async fn mark_exit_ready(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<TruckResponse>, AppError> {
    if !auth.has_role(&["gate_guard", "dock_operator"]) {
        return Err(AppError::forbidden("Not allowed to mark trucks exit-ready"));
    }

    let mut tx = db_pool.begin().await?;
    let truck = fetch_truck_for_update(&mut tx, id).await?;

    let next = transition(truck.status()?, TruckEvent::MarkExitReady, truck.approval())?;

    let updated = sqlx::query_as::<_, TruckRow>(
        r#"UPDATE trucks SET status = $2, updated_at = now() WHERE id = $1 RETURNING *"#,
    )
    .bind(id)
    .bind(next.as_str())
    .fetch_one(&mut *tx)
    .await?;

    audit::record(&mut tx, Category::Gate, Some(id), &auth, "Exit Ready", json!({})).await?;

    tx.commit().await?;

    Ok(Json(updated.into()))
}

pub async fn exit_truck(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<TruckResponse>, AppError> {
    if !auth.has_role(&["gate_guard"]) {
        return Err(AppError::forbidden("Only gate guards can record exits"));
    }

    let mut tx = db_pool.begin().await?;
    let truck = fetch_truck_for_update(&mut tx, id).await?;

    let next = transition(truck.status()?, TruckEvent::Exit, truck.approval())?;

    let updated = sqlx::query_as::<_, TruckRow>(
        r#"UPDATE trucks SET status = $2, current_dock_id = NULL, updated_at = now()
        WHERE id = $1 RETURNING *"#,
    )
    .bind(id)
    .bind(next.as_str())
    .fetch_one(&mut *tx)
    .await?;

    audit::record(&mut tx, Category::Gate, Some(id), &auth, "Exited", json!({})).await?;

    tx.commit().await?;

    Ok(Json(updated.into()))
}

/// Atomic claim-if-free: the partial unique index on IN_PROGRESS rows makes
/// the insert itself the occupancy check, so two operators can never both
/// win the same dock.
pub async fn claim_dock(
    tx: &mut Transaction<'_, Postgres>,
    dock_id: i64,
    truck_id: i64,
    kind: OperationKind,
    auth: &AuthContext,
) -> Result<(), AppError> {
    let (is_active, dock_type) = sqlx::query_as::<_, (bool, String)>(
        r#"SELECT is_active, dock_type FROM docks WHERE id = $1"#,
    )
    .bind(dock_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::not_found("Dock not found"))?;

    if !is_active {
        return Err(AppError::conflict("Dock is not active"));
    }
    if !kind.supported_by(&dock_type) {
        return Err(AppError::conflict(format!(
            "Dock does not support {} operations",
            kind.as_str()
        )));
    }

    sqlx::query(
        r#"INSERT INTO dock_operations (dock_id, truck_id, kind, status, started_by)
        VALUES ($1, $2, $3, 'IN_PROGRESS', $4)"#,
    )
    .bind(dock_id)
    .bind(truck_id)
    .bind(kind.as_str())
    .bind(auth.user_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if let Some(db) = e.as_database_error() {
            if db.code().as_deref() == Some("23505")
                && db.constraint() == Some("dock_operations_in_progress_key")
            {
                return AppError::conflict("Dock is occupied");
            }
            if db.code().as_deref() == Some("23503") {
                return AppError::validation("Invalid dock or truck reference");
            }
        }
        AppError::db(e)
    })?;

    Ok(())
}
