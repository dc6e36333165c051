use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::FromRow;

use crate::error::AppError;
use crate::lifecycle::{ApprovalStatus, TruckStatus};

/// One scheduled vehicle movement, as stored. Shared by the scheduling,
/// gate, weighbridge and dock handlers.
#[derive(Debug, FromRow)]
pub struct TruckRow {
    pub id: i64,
    pub vehicle_number: String,
    pub driver_name: String,
    pub driver_license: Option<String>,
    pub driver_mobile: Option<String>,
    pub transporter_name: String,
    pub depot_name: Option<String>,
    pub supplier_name: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub reporting_date: NaiveDate,
    pub reporting_time: Option<String>,
    pub gate: Option<String>,
    pub rc_expiry: Option<NaiveDate>,
    pub insurance_expiry: Option<NaiveDate>,
    pub pollution_expiry: Option<NaiveDate>,
    pub license_expiry: Option<NaiveDate>,
    pub status: String,
    pub approval_status: Option<String>,
    pub failed_checks: Option<Value>,
    pub approval_reason: Option<String>,
    pub current_dock_id: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TruckRow {
    pub fn status(&self) -> Result<TruckStatus, AppError> {
        Ok(self.status.parse()?)
    }

    pub fn approval(&self) -> Option<ApprovalStatus> {
        self.approval_status.as_deref().and_then(|s| s.parse().ok())
    }
}
