use axum::{extract::State, Json};
use axum::extract::Extension;

use crate::dtos::report::{KpiResponse, StatusCount};
use crate::error::AppError;
use crate::lifecycle::{Milestone, TruckStatus};
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

async fn count_one(db_pool: &sqlx::PgPool, sql: &str) -> Result<i64, AppError> {
    let row: (i64,) = sqlx::query_as(sql).fetch_one(db_pool).await?;
    Ok(row.0)
}

/// Read-only aggregation for the operations dashboard. Refresh cadence is
/// the client's business.
pub async fn get_kpis(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
) -> Result<Json<KpiResponse>, AppError> {
    let by_status: Vec<(String, i64)> = sqlx::query_as(
        r#"SELECT status, COUNT(*) FROM trucks GROUP BY status ORDER BY status"#,
    )
    .fetch_all(&db_pool)
    .await?;

    let trucks_inside = by_status
        .iter()
        .filter(|(status, _)| {
            status.parse::<TruckStatus>().map(|s| s.is_inside()).unwrap_or(false)
        })
        .map(|(_, count)| count)
        .sum();

    let trucks_by_status = by_status
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();

    let pending_approvals = count_one(
        &db_pool,
        r#"SELECT COUNT(*) FROM approval_requests WHERE status = 'pending'"#,
    )
    .await?;

    let pending_weighings: (i64,) = sqlx::query_as(
        r#"SELECT COUNT(*) FROM weighbridge_entries WHERE milestone = $1"#,
    )
    .bind(Milestone::PendingWeighing.as_str())
    .fetch_one(&db_pool)
    .await?;

    let docks_total = count_one(
        &db_pool,
        r#"SELECT COUNT(*) FROM docks WHERE is_active"#,
    )
    .await?;

    let docks_occupied = count_one(
        &db_pool,
        r#"SELECT COUNT(DISTINCT dock_id) FROM dock_operations WHERE status = 'IN_PROGRESS'"#,
    )
    .await?;

    let scheduled_today = count_one(
        &db_pool,
        r#"SELECT COUNT(*) FROM trucks WHERE reporting_date = CURRENT_DATE"#,
    )
    .await?;

    let exited_today = count_one(
        &db_pool,
        r#"SELECT COUNT(*) FROM audit_log
        WHERE action = 'Exited' AND created_at::DATE = CURRENT_DATE"#,
    )
    .await?;

    // Gate-to-exit turnaround from the audit trail: first verification to
    // last exit per truck.
    let avg_turnaround: (Option<f64>,) = sqlx::query_as(
        r#"SELECT AVG(mins)::DOUBLE PRECISION FROM (
            SELECT e.truck_id,
                EXTRACT(EPOCH FROM (MAX(e.created_at) - MIN(v.created_at))) / 60.0 AS mins
            FROM audit_log e
            JOIN audit_log v ON v.truck_id = e.truck_id AND v.action = 'Verified'
            WHERE e.action = 'Exited'
            GROUP BY e.truck_id
        ) turnarounds"#,
    )
    .fetch_one(&db_pool)
    .await?;

    Ok(Json(KpiResponse {
        trucks_by_status,
        trucks_inside,
        pending_approvals,
        pending_weighings: pending_weighings.0,
        docks_occupied,
        docks_total,
        scheduled_today,
        exited_today,
        avg_turnaround_minutes: avg_turnaround.0,
    }))
}
