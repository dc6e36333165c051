use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::lifecycle::OperationKind;

#[derive(Deserialize)]
pub struct RecordWeightRequest {
    pub gross_weight: f64,
    pub tare_weight: f64,
}

#[derive(Deserialize)]
pub struct RouteEntryRequest {
    /// "parking" or "dock".
    pub destination: String,
    pub dock_id: Option<i64>,
    /// Loading or unloading, required when destination is "dock".
    pub operation_kind: Option<OperationKind>,
}

#[derive(Deserialize)]
pub struct ListEntriesQuery {
    pub milestone: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct WeighbridgeEntryRow {
    pub id: i64,
    pub truck_id: i64,
    pub milestone: String,
    pub gross_weight: Option<f64>,
    pub tare_weight: Option<f64>,
    pub net_weight: Option<f64>,
    pub dock_id: Option<i64>,
    pub weighed_by: Option<i64>,
    pub weighed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct WeighbridgeEntryResponse {
    pub id: i64,
    pub truck_id: i64,
    pub milestone: String,
    pub gross_weight: Option<f64>,
    pub tare_weight: Option<f64>,
    pub net_weight: Option<f64>,
    pub dock_id: Option<i64>,
    pub weighed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// True when the weighment was held for a supervisor exception.
    pub approval_pending: bool,
}

impl WeighbridgeEntryResponse {
    pub fn from_row(e: WeighbridgeEntryRow, approval_pending: bool) -> Self {
        WeighbridgeEntryResponse {
            id: e.id,
            truck_id: e.truck_id,
            milestone: e.milestone,
            gross_weight: e.gross_weight,
            tare_weight: e.tare_weight,
            net_weight: e.net_weight,
            dock_id: e.dock_id,
            weighed_at: e.weighed_at,
            created_at: e.created_at,
            approval_pending,
        }
    }
}
