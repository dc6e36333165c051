use axum::{extract::State, Json};
use axum::extract::{Extension, Path, Query};
use serde_json::json;
use sqlx::PgConnection;

use crate::audit::{self, Category};
use crate::dtos::weighbridge::{
    ListEntriesQuery, RecordWeightRequest, RouteEntryRequest, WeighbridgeEntryResponse,
    WeighbridgeEntryRow,
};
use crate::error::AppError;
use crate::handlers::gate::claim_dock;
use crate::lifecycle::{
    needs_weighment_approval, net_weight, transition, Milestone, TruckEvent,
};
use crate::middleware::auth::AuthContext;
use crate::models::truck::TruckRow;
use crate::state::AppState;

async fn has_pending_weighment_approval(
    conn: &mut PgConnection,
    entry_id: i64,
) -> Result<bool, AppError> {
    let pending = sqlx::query_as::<_, (bool,)>(
        r#"SELECT EXISTS(
            SELECT 1 FROM approval_requests
            WHERE kind = 'weighment' AND status = 'pending' AND weighbridge_entry_id = $1
        )"#,
    )
    .bind(entry_id)
    .fetch_one(conn)
    .await?;
    Ok(pending.0)
}

pub async fn list_entries(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<Vec<WeighbridgeEntryResponse>>, AppError> {
    if !auth.has_role(&["weighbridge_operator", "supervisor"]) {
        return Err(AppError::forbidden("Not allowed to view weighbridge entries"));
    }
    if let Some(milestone) = &query.milestone {
        milestone.parse::<Milestone>()?;
    }

    let entries = sqlx::query_as::<_, WeighbridgeEntryRow>(
        r#"SELECT * FROM weighbridge_entries
        WHERE ($1::TEXT IS NULL OR milestone = $1)
        ORDER BY created_at DESC"#,
    )
    .bind(&query.milestone)
    .fetch_all(&db_pool)
    .await?;

    let mut out = Vec::with_capacity(entries.len());
    let mut conn = db_pool.acquire().await?;
    for entry in entries {
        let pending = has_pending_weighment_approval(&mut conn, entry.id).await?;
        out.push(WeighbridgeEntryResponse::from_row(entry, pending));
    }
    Ok(Json(out))
}

pub async fn get_entry(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<WeighbridgeEntryResponse>, AppError> {
    if !auth.has_role(&["weighbridge_operator", "supervisor"]) {
        return Err(AppError::forbidden("Not allowed to view weighbridge entries"));
    }

    let entry = sqlx::query_as::<_, WeighbridgeEntryRow>(
        r#"SELECT * FROM weighbridge_entries WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Weighbridge entry not found"))?;

    let mut conn = db_pool.acquire().await?;
    let pending = has_pending_weighment_approval(&mut conn, entry.id).await?;
    Ok(Json(WeighbridgeEntryResponse::from_row(entry, pending)))
}

/// Records a weighment. The server computes the net; past the threshold
/// the entry stays at PENDING_WEIGHING and a weighment approval request
/// opens in the same transaction.
pub async fn record_weight(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<RecordWeightRequest>,
) -> Result<Json<WeighbridgeEntryResponse>, AppError> {
    if !auth.has_role(&["weighbridge_operator"]) {
        return Err(AppError::forbidden("Only weighbridge operators can record weights"));
    }
    if !req.gross_weight.is_finite() || !req.tare_weight.is_finite() {
        return Err(AppError::validation("Weights must be numbers"));
    }
    if req.gross_weight < 0.0 || req.tare_weight < 0.0 {
        return Err(AppError::validation("Weights must not be negative"));
    }

    let mut tx = db_pool.begin().await?;

    let entry = sqlx::query_as::<_, WeighbridgeEntryRow>(
        r#"SELECT * FROM weighbridge_entries WHERE id = $1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Weighbridge entry not found"))?;

    // Re-weighing is allowed while the entry is still pending (a rejected
    // exception lands back here), never after it was weighed.
    if entry.milestone.parse::<Milestone>()? != Milestone::PendingWeighing {
        return Err(AppError::conflict("Entry has already been weighed"));
    }
    if has_pending_weighment_approval(&mut tx, id).await? {
        return Err(AppError::conflict("A weighment approval is already pending"));
    }

    let net = net_weight(req.gross_weight, req.tare_weight);
    let held = needs_weighment_approval(net);
    let milestone = if held { Milestone::PendingWeighing } else { Milestone::Weighed };

    let updated = sqlx::query_as::<_, WeighbridgeEntryRow>(
        r#"UPDATE weighbridge_entries SET
            gross_weight = $2, tare_weight = $3, net_weight = $4,
            milestone = $5, weighed_by = $6, weighed_at = now()
        WHERE id = $1 RETURNING *"#,
    )
    .bind(id)
    .bind(req.gross_weight)
    .bind(req.tare_weight)
    .bind(net)
    .bind(milestone.as_str())
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await?;

    if held {
        sqlx::query(
            r#"INSERT INTO approval_requests
                (kind, status, truck_id, weighbridge_entry_id, reason, data, requested_by)
            VALUES ('weighment', 'pending', $1, $2, $3, $4, $5)"#,
        )
        .bind(entry.truck_id)
        .bind(id)
        .bind(format!("Net weight {net} exceeds threshold"))
        .bind(json!({
            "grossWeight": req.gross_weight,
            "tareWeight": req.tare_weight,
            "netWeight": net,
        }))
        .bind(auth.user_id)
        .execute(&mut *tx)
        .await?;
    }

    audit::record(
        &mut tx,
        Category::Weighbridge,
        Some(entry.truck_id),
        &auth,
        if held { "Weighment Held" } else { "Weighed" },
        json!({
            "entryId": id,
            "grossWeight": req.gross_weight,
            "tareWeight": req.tare_weight,
            "netWeight": net,
        }),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(WeighbridgeEntryResponse::from_row(updated, held)))
}

/// Sends a weighed truck onward. Parking needs nothing; a dock is claimed
/// atomically. The truck status mirrors the milestone through the
/// transition function.
pub async fn route_entry(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<RouteEntryRequest>,
) -> Result<Json<WeighbridgeEntryResponse>, AppError> {
    if !auth.has_role(&["weighbridge_operator"]) {
        return Err(AppError::forbidden("Only weighbridge operators can route trucks"));
    }

    let mut tx = db_pool.begin().await?;

    let entry = sqlx::query_as::<_, WeighbridgeEntryRow>(
        r#"SELECT * FROM weighbridge_entries WHERE id = $1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Weighbridge entry not found"))?;

    if entry.milestone.parse::<Milestone>()? != Milestone::Weighed {
        return Err(AppError::conflict("Entry must be weighed before routing"));
    }

    let truck = sqlx::query_as::<_, TruckRow>(r#"SELECT * FROM trucks WHERE id = $1 FOR UPDATE"#)
        .bind(entry.truck_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))?;

    let (milestone, event, dock_id) = match req.destination.as_str() {
        "parking" => (Milestone::AtParking, TruckEvent::RouteToParking, None),
        "dock" => {
            let dock_id = req
                .dock_id
                .ok_or_else(|| AppError::validation("dock_id is required for dock routing"))?;
            let kind = req.operation_kind.ok_or_else(|| {
                AppError::validation("operation_kind is required for dock routing")
            })?;
            claim_dock(&mut tx, dock_id, entry.truck_id, kind, &auth).await?;
            (Milestone::AtDock, TruckEvent::RouteToDock, Some(dock_id))
        }
        _ => return Err(AppError::validation("destination must be 'parking' or 'dock'")),
    };

    let next = transition(truck.status()?, event, truck.approval())?;

    let updated = sqlx::query_as::<_, WeighbridgeEntryRow>(
        r#"UPDATE weighbridge_entries SET milestone = $2, dock_id = $3 WHERE id = $1 RETURNING *"#,
    )
    .bind(id)
    .bind(milestone.as_str())
    .bind(dock_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"UPDATE trucks SET status = $2, current_dock_id = $3, updated_at = now() WHERE id = $1"#,
    )
    .bind(entry.truck_id)
    .bind(next.as_str())
    .bind(dock_id)
    .execute(&mut *tx)
    .await?;

    audit::record(
        &mut tx,
        Category::Weighbridge,
        Some(entry.truck_id),
        &auth,
        "Routed",
        json!({ "entryId": id, "destination": req.destination, "dockId": dock_id }),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(WeighbridgeEntryResponse::from_row(updated, false)))
}
