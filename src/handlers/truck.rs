use axum::{extract::State, Json};
use axum::http::StatusCode;
use axum::extract::{Extension, Path, Query};
use serde_json::json;

use crate::audit::{self, Category};
use crate::auth::jwt::sign_gate_pass;
use crate::dtos::truck::{
    CancelTruckRequest, CreateTruckRequest, GatePassResponse, ListTrucksQuery,
    RescheduleTruckRequest, TruckResponse, UpdateTruckRequest,
};
use crate::error::AppError;
use crate::lifecycle::{transition, TruckEvent, TruckStatus};
use crate::middleware::auth::AuthContext;
use crate::models::truck::TruckRow;
use crate::state::AppState;

pub async fn create_truck(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTruckRequest>,
) -> Result<(StatusCode, Json<TruckResponse>), AppError> {
    if !auth.has_role(&["transporter"]) {
        return Err(AppError::forbidden("Only transporters can schedule trucks"));
    }
    if req.vehicle_number.trim().is_empty() {
        return Err(AppError::validation("Vehicle number is required"));
    }
    if req.driver_name.trim().is_empty() {
        return Err(AppError::validation("Driver name is required"));
    }
    if req.transporter_name.trim().is_empty() {
        return Err(AppError::validation("Transporter name is required"));
    }

    let mut tx = db_pool.begin().await?;

    let truck = sqlx::query_as::<_, TruckRow>(
        r#"INSERT INTO trucks (
            vehicle_number, driver_name, driver_license, driver_mobile,
            transporter_name, depot_name, supplier_name, source, destination,
            reporting_date, reporting_time, gate,
            rc_expiry, insurance_expiry, pollution_expiry, license_expiry,
            status, created_by
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)
        RETURNING *"#,
    )
    .bind(req.vehicle_number.trim())
    .bind(req.driver_name.trim())
    .bind(&req.driver_license)
    .bind(&req.driver_mobile)
    .bind(req.transporter_name.trim())
    .bind(&req.depot_name)
    .bind(&req.supplier_name)
    .bind(&req.source)
    .bind(&req.destination)
    .bind(req.reporting_date)
    .bind(&req.reporting_time)
    .bind(&req.gate)
    .bind(req.rc_expiry)
    .bind(req.insurance_expiry)
    .bind(req.pollution_expiry)
    .bind(req.license_expiry)
    .bind(TruckStatus::Scheduled.as_str())
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await?;

    audit::record(
        &mut tx,
        Category::Scheduling,
        Some(truck.id),
        &auth,
        "Scheduled",
        json!({ "vehicleNumber": &truck.vehicle_number, "reportingDate": truck.reporting_date }),
    )
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(truck.into())))
}

pub async fn get_truck(
    State(AppState { db_pool }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TruckResponse>, AppError> {
    let truck = sqlx::query_as::<_, TruckRow>(r#"SELECT * FROM trucks WHERE id = $1"#)
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))?;

    Ok(Json(truck.into()))
}

pub async fn list_trucks(
    State(AppState { db_pool }): State<AppState>,
    Query(query): Query<ListTrucksQuery>,
) -> Result<Json<Vec<TruckResponse>>, AppError> {
    if let Some(status) = &query.status {
        // Reject unknown filter values up front rather than returning nothing.
        status.parse::<TruckStatus>()?;
    }

    let trucks = sqlx::query_as::<_, TruckRow>(
        r#"SELECT * FROM trucks
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::DATE IS NULL OR reporting_date = $2)
        ORDER BY reporting_date DESC, id DESC"#,
    )
    .bind(&query.status)
    .bind(query.reporting_date)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(trucks.into_iter().map(Into::into).collect()))
}

pub async fn update_truck(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTruckRequest>,
) -> Result<Json<TruckResponse>, AppError> {
    if !auth.has_role(&["transporter"]) {
        return Err(AppError::forbidden("Only transporters can edit schedules"));
    }

    let mut tx = db_pool.begin().await?;

    let existing = sqlx::query_as::<_, TruckRow>(r#"SELECT * FROM trucks WHERE id = $1 FOR UPDATE"#)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))?;

    // Schedule details are editable only before the truck reaches the gate.
    if existing.status()? != TruckStatus::Scheduled {
        return Err(AppError::conflict("Only scheduled trucks can be edited"));
    }

    let truck = sqlx::query_as::<_, TruckRow>(
        r#"UPDATE trucks SET
            vehicle_number = COALESCE($2, vehicle_number),
            driver_name = COALESCE($3, driver_name),
            driver_license = COALESCE($4, driver_license),
            driver_mobile = COALESCE($5, driver_mobile),
            transporter_name = COALESCE($6, transporter_name),
            depot_name = COALESCE($7, depot_name),
            supplier_name = COALESCE($8, supplier_name),
            source = COALESCE($9, source),
            destination = COALESCE($10, destination),
            reporting_date = COALESCE($11, reporting_date),
            reporting_time = COALESCE($12, reporting_time),
            gate = COALESCE($13, gate),
            rc_expiry = COALESCE($14, rc_expiry),
            insurance_expiry = COALESCE($15, insurance_expiry),
            pollution_expiry = COALESCE($16, pollution_expiry),
            license_expiry = COALESCE($17, license_expiry),
            updated_at = now()
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(id)
    .bind(req.vehicle_number.as_deref().map(str::trim))
    .bind(req.driver_name.as_deref().map(str::trim))
    .bind(&req.driver_license)
    .bind(&req.driver_mobile)
    .bind(req.transporter_name.as_deref().map(str::trim))
    .bind(&req.depot_name)
    .bind(&req.supplier_name)
    .bind(&req.source)
    .bind(&req.destination)
    .bind(req.reporting_date)
    .bind(&req.reporting_time)
    .bind(&req.gate)
    .bind(req.rc_expiry)
    .bind(req.insurance_expiry)
    .bind(req.pollution_expiry)
    .bind(req.license_expiry)
    .fetch_one(&mut *tx)
    .await?;

    audit::record(&mut tx, Category::Scheduling, Some(id), &auth, "Updated", json!({}))
        .await?;

    tx.commit().await?;

    Ok(Json(truck.into()))
}

pub async fn cancel_truck(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<CancelTruckRequest>,
) -> Result<Json<TruckResponse>, AppError> {
    if !auth.has_role(&["transporter"]) {
        return Err(AppError::forbidden("Only transporters can cancel schedules"));
    }

    let mut tx = db_pool.begin().await?;

    let existing = sqlx::query_as::<_, TruckRow>(r#"SELECT * FROM trucks WHERE id = $1 FOR UPDATE"#)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))?;

    let next = transition(existing.status()?, TruckEvent::Cancel, existing.approval())?;

    let truck = sqlx::query_as::<_, TruckRow>(
        r#"UPDATE trucks SET status = $2, updated_at = now() WHERE id = $1 RETURNING *"#,
    )
    .bind(id)
    .bind(next.as_str())
    .fetch_one(&mut *tx)
    .await?;

    audit::record(
        &mut tx,
        Category::Scheduling,
        Some(id),
        &auth,
        "Cancelled",
        json!({ "reason": req.reason }),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(truck.into()))
}

pub async fn reschedule_truck(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<RescheduleTruckRequest>,
) -> Result<(StatusCode, Json<TruckResponse>), AppError> {
    if !auth.has_role(&["transporter"]) {
        return Err(AppError::forbidden("Only transporters can reschedule trucks"));
    }

    let mut tx = db_pool.begin().await?;

    let existing = sqlx::query_as::<_, TruckRow>(r#"SELECT * FROM trucks WHERE id = $1 FOR UPDATE"#)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))?;

    if req.as_new {
        // Leave the cancelled record in place and copy identity fields into
        // a fresh schedule.
        if existing.status()? != TruckStatus::Cancelled {
            return Err(AppError::conflict("Only cancelled trucks can be rescheduled"));
        }

        let truck = sqlx::query_as::<_, TruckRow>(
            r#"INSERT INTO trucks (
                vehicle_number, driver_name, driver_license, driver_mobile,
                transporter_name, depot_name, supplier_name, source, destination,
                reporting_date, reporting_time, gate,
                rc_expiry, insurance_expiry, pollution_expiry, license_expiry,
                status, created_by
            )
            SELECT vehicle_number, driver_name, driver_license, driver_mobile,
                transporter_name, depot_name, supplier_name, source, destination,
                $2, $3, gate,
                rc_expiry, insurance_expiry, pollution_expiry, license_expiry,
                $4, $5
            FROM trucks WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(req.reporting_date)
        .bind(&req.reporting_time)
        .bind(TruckStatus::Scheduled.as_str())
        .bind(auth.user_id)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut tx,
            Category::Scheduling,
            Some(truck.id),
            &auth,
            "Rescheduled",
            json!({ "fromTruckId": id, "reportingDate": req.reporting_date }),
        )
        .await?;

        tx.commit().await?;
        return Ok((StatusCode::CREATED, Json(truck.into())));
    }

    let next = transition(existing.status()?, TruckEvent::Reschedule, existing.approval())?;

    let truck = sqlx::query_as::<_, TruckRow>(
        r#"UPDATE trucks SET
            status = $2,
            reporting_date = $3,
            reporting_time = COALESCE($4, reporting_time),
            approval_status = NULL,
            failed_checks = NULL,
            approval_reason = NULL,
            updated_at = now()
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(id)
    .bind(next.as_str())
    .bind(req.reporting_date)
    .bind(&req.reporting_time)
    .fetch_one(&mut *tx)
    .await?;

    audit::record(
        &mut tx,
        Category::Scheduling,
        Some(id),
        &auth,
        "Rescheduled",
        json!({ "reportingDate": req.reporting_date }),
    )
    .await?;

    tx.commit().await?;

    Ok((StatusCode::OK, Json(truck.into())))
}

/// Mints the QR payload for a scheduled truck. The client renders it as an
/// image; the gate lookup endpoint accepts the same token back.
pub async fn get_gate_pass(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<GatePassResponse>, AppError> {
    if !auth.has_role(&["transporter", "gate_guard"]) {
        return Err(AppError::forbidden("Not allowed to issue gate passes"));
    }

    let truck = sqlx::query_as::<_, TruckRow>(r#"SELECT * FROM trucks WHERE id = $1"#)
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Truck not found"))?;

    if truck.status()? != TruckStatus::Scheduled {
        return Err(AppError::conflict("Gate passes are issued for scheduled trucks only"));
    }

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::internal("JWT secret not configured"))?;
    let token = sign_gate_pass(truck.id, &truck.vehicle_number, &secret)?;

    Ok(Json(GatePassResponse { truck_id: truck.id, token }))
}
