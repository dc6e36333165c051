use axum::{extract::State, Json};
use axum::http::StatusCode;
use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;

use crate::audit::{self, Category};
use crate::dtos::dock::{
    AssignTruckRequest, CreateDockRequest, DockOperationResponse, DockResponse, DockRow,
    UpdateDockRequest,
};
use crate::dtos::truck::TruckResponse;
use crate::error::AppError;
use crate::handlers::gate::claim_dock;
use crate::lifecycle::{transition, OperationKind, TruckEvent};
use crate::middleware::auth::AuthContext;
use crate::models::truck::TruckRow;
use crate::state::AppState;

const DOCK_TYPES: &[&str] = &["loading", "unloading", "both"];

pub async fn create_dock(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateDockRequest>,
) -> Result<(StatusCode, Json<DockResponse>), AppError> {
    if !auth.has_role(&[]) {
        return Err(AppError::forbidden("Only admins can create docks"));
    }
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Dock name is required"));
    }
    let dock_type = req.dock_type.as_deref().unwrap_or("both");
    if !DOCK_TYPES.contains(&dock_type) {
        return Err(AppError::validation("dock_type must be loading, unloading or both"));
    }
    if req.capacity.is_some_and(|c| c < 1) {
        return Err(AppError::validation("Capacity must be at least 1"));
    }

    let dock = sqlx::query_as::<_, DockRow>(
        r#"INSERT INTO docks (name, dock_type, capacity)
        VALUES ($1, $2, COALESCE($3, 1))
        RETURNING *"#,
    )
    .bind(req.name.trim())
    .bind(dock_type)
    .bind(req.capacity)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        if let Some(db) = e.as_database_error() {
            if db.code().as_deref() == Some("23505") {
                return AppError::conflict("Dock name already exists");
            }
        }
        AppError::db(e)
    })?;

    Ok((StatusCode::CREATED, Json(DockResponse::from_row(dock, false))))
}

pub async fn update_dock(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDockRequest>,
) -> Result<Json<DockResponse>, AppError> {
    if !auth.has_role(&[]) {
        return Err(AppError::forbidden("Only admins can update docks"));
    }
    if let Some(dock_type) = &req.dock_type {
        if !DOCK_TYPES.contains(&dock_type.as_str()) {
            return Err(AppError::validation("dock_type must be loading, unloading or both"));
        }
    }

    let dock = sqlx::query_as::<_, DockRow>(
        r#"UPDATE docks SET
            name = COALESCE($2, name),
            dock_type = COALESCE($3, dock_type),
            capacity = COALESCE($4, capacity),
            is_active = COALESCE($5, is_active)
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.dock_type)
    .bind(req.capacity)
    .bind(req.is_active)
    .fetch_optional(&db_pool)
    .await
    .map_err(|e| {
        if let Some(db) = e.as_database_error() {
            if db.code().as_deref() == Some("23505") {
                return AppError::conflict("Dock name already exists");
            }
        }
        AppError::db(e)
    })?
    .ok_or_else(|| AppError::not_found("Dock not found"))?;

    let occupied = sqlx::query_as::<_, (bool,)>(
        r#"SELECT EXISTS(
            SELECT 1 FROM dock_operations WHERE dock_id = $1 AND status = 'IN_PROGRESS'
        )"#,
    )
    .bind(id)
    .fetch_one(&db_pool)
    .await?;

    Ok(Json(DockResponse::from_row(dock, occupied.0)))
}

/// Dock list with an occupancy snapshot for display. Assignment itself
/// never trusts this snapshot; the claim is enforced at insert time.
pub async fn list_docks(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
) -> Result<Json<Vec<DockResponse>>, AppError> {
    let docks = sqlx::query_as::<_, DockRow>(r#"SELECT * FROM docks ORDER BY name ASC"#)
        .fetch_all(&db_pool)
        .await?;

    let occupied_ids: Vec<(i64,)> = sqlx::query_as(
        r#"SELECT dock_id FROM dock_operations WHERE status = 'IN_PROGRESS'"#,
    )
    .fetch_all(&db_pool)
    .await?;
    let occupied: HashSet<i64> = occupied_ids.into_iter().map(|(id,)| id).collect();

    Ok(Json(
        docks
            .into_iter()
            .map(|d| {
                let is_occupied = occupied.contains(&d.id);
                DockResponse::from_row(d, is_occupied)
            })
            .collect(),
    ))
}

/// Calls a parked truck to a dock. Only `at_parking` trucks are eligible;
/// a truck still on the weighbridge leaves it through the weighbridge
/// routing, which checks the entry milestone. The same claim used at the
/// gate and the weighbridge guards the assignment.
pub async fn assign_truck(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<AssignTruckRequest>,
) -> Result<Json<TruckResponse>, AppError> {
    if !auth.has_role(&["dock_operator"]) {
        return Err(AppError::forbidden("Only dock operators can assign trucks"));
    }

    let mut tx = db_pool.begin().await?;

    let truck = sqlx::query_as::<_, TruckRow>(r#"SELECT * FROM trucks WHERE id = $1 FOR UPDATE"#)
        .bind(req.truck_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))?;

    let next = transition(truck.status()?, TruckEvent::CallToDock, truck.approval())?;

    claim_dock(&mut tx, id, req.truck_id, req.kind, &auth).await?;

    let updated = sqlx::query_as::<_, TruckRow>(
        r#"UPDATE trucks SET status = $2, current_dock_id = $3, updated_at = now()
        WHERE id = $1 RETURNING *"#,
    )
    .bind(req.truck_id)
    .bind(next.as_str())
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    audit::record(
        &mut tx,
        Category::Dock,
        Some(req.truck_id),
        &auth,
        "Assigned To Dock",
        json!({ "dockId": id, "kind": req.kind }),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(updated.into()))
}

#[derive(Deserialize)]
pub struct ListOperationsQuery {
    pub status: Option<String>,
    pub dock_id: Option<i64>,
}

pub async fn list_operations(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListOperationsQuery>,
) -> Result<Json<Vec<DockOperationResponse>>, AppError> {
    if !auth.has_role(&["dock_operator", "supervisor"]) {
        return Err(AppError::forbidden("Not allowed to view dock operations"));
    }
    if let Some(status) = &query.status {
        if status != "IN_PROGRESS" && status != "COMPLETED" {
            return Err(AppError::validation("status must be IN_PROGRESS or COMPLETED"));
        }
    }

    let ops = sqlx::query_as::<_, DockOperationResponse>(
        r#"SELECT id, dock_id, truck_id, kind, status, started_at, completed_at
        FROM dock_operations
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::BIGINT IS NULL OR dock_id = $2)
        ORDER BY started_at DESC"#,
    )
    .bind(&query.status)
    .bind(query.dock_id)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(ops))
}

/// Finishes a loading/unloading session: the operation row closes, the
/// dock frees up, and the truck moves to its `*_completed` status.
pub async fn complete_operation(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<DockOperationResponse>, AppError> {
    if !auth.has_role(&["dock_operator"]) {
        return Err(AppError::forbidden("Only dock operators can complete operations"));
    }

    let mut tx = db_pool.begin().await?;

    let op = sqlx::query_as::<_, DockOperationResponse>(
        r#"UPDATE dock_operations SET status = 'COMPLETED', completed_at = now()
        WHERE id = $1 AND status = 'IN_PROGRESS'
        RETURNING id, dock_id, truck_id, kind, status, started_at, completed_at"#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("No running operation with that id"))?;

    let kind: OperationKind = match op.kind.as_str() {
        "loading" => OperationKind::Loading,
        "unloading" => OperationKind::Unloading,
        other => return Err(AppError::internal(format!("Unknown operation kind '{other}'"))),
    };

    let truck = sqlx::query_as::<_, TruckRow>(r#"SELECT * FROM trucks WHERE id = $1 FOR UPDATE"#)
        .bind(op.truck_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))?;

    let next = transition(truck.status()?, TruckEvent::CompleteOperation { kind }, truck.approval())?;

    sqlx::query(r#"UPDATE trucks SET status = $2, updated_at = now() WHERE id = $1"#)
        .bind(op.truck_id)
        .bind(next.as_str())
        .execute(&mut *tx)
        .await?;

    audit::record(
        &mut tx,
        Category::Dock,
        Some(op.truck_id),
        &auth,
        "Operation Completed",
        json!({ "operationId": id, "dockId": op.dock_id, "kind": &op.kind }),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(op))
}
