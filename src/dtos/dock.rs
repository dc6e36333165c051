use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::lifecycle::OperationKind;

#[derive(Deserialize)]
pub struct CreateDockRequest {
    pub name: String,
    /// "loading", "unloading" or "both".
    pub dock_type: Option<String>,
    pub capacity: Option<i32>,
}

#[derive(Deserialize)]
pub struct UpdateDockRequest {
    pub name: Option<String>,
    pub dock_type: Option<String>,
    pub capacity: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct AssignTruckRequest {
    pub truck_id: i64,
    pub kind: OperationKind,
}

#[derive(Debug, FromRow)]
pub struct DockRow {
    pub id: i64,
    pub name: String,
    pub dock_type: String,
    pub capacity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct DockResponse {
    pub id: i64,
    pub name: String,
    pub dock_type: String,
    pub capacity: i32,
    pub is_active: bool,
    /// Display-only snapshot; assignment never relies on it.
    pub occupied: bool,
    pub created_at: DateTime<Utc>,
}

impl DockResponse {
    pub fn from_row(d: DockRow, occupied: bool) -> Self {
        DockResponse {
            id: d.id,
            name: d.name,
            dock_type: d.dock_type,
            capacity: d.capacity,
            is_active: d.is_active,
            occupied,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, FromRow, Serialize)]
pub struct DockOperationResponse {
    pub id: i64,
    pub dock_id: i64,
    pub truck_id: i64,
    pub kind: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
