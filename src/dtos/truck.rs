use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::models::truck::TruckRow;

#[derive(Deserialize)]
pub struct CreateTruckRequest {
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
}

#[derive(Deserialize)]
pub struct UpdateTruckRequest {
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub driver_license: Option<String>,
    pub driver_mobile: Option<String>,
    pub transporter_name: Option<String>,
    pub depot_name: Option<String>,
    pub supplier_name: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub reporting_date: Option<NaiveDate>,
    pub reporting_time: Option<String>,
    pub gate: Option<String>,
    pub rc_expiry: Option<NaiveDate>,
    pub insurance_expiry: Option<NaiveDate>,
    pub pollution_expiry: Option<NaiveDate>,
    pub license_expiry: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct CancelTruckRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct RescheduleTruckRequest {
    pub reporting_date: NaiveDate,
    pub reporting_time: Option<String>,
    /// When true, the cancelled record is left alone and a fresh schedule
    /// is created copying the identity fields.
    #[serde(default)]
    pub as_new: bool,
}

#[derive(Deserialize)]
pub struct ListTrucksQuery {
    pub status: Option<String>,
    pub reporting_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct TruckResponse {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TruckRow> for TruckResponse {
    fn from(t: TruckRow) -> Self {
        TruckResponse {
            id: t.id,
            vehicle_number: t.vehicle_number,
            driver_name: t.driver_name,
            driver_license: t.driver_license,
            driver_mobile: t.driver_mobile,
            transporter_name: t.transporter_name,
            depot_name: t.depot_name,
            supplier_name: t.supplier_name,
            source: t.source,
            destination: t.destination,
            reporting_date: t.reporting_date,
            reporting_time: t.reporting_time,
            gate: t.gate,
            rc_expiry: t.rc_expiry,
            insurance_expiry: t.insurance_expiry,
            pollution_expiry: t.pollution_expiry,
            license_expiry: t.license_expiry,
            status: t.status,
            approval_status: t.approval_status,
            failed_checks: t.failed_checks,
            approval_reason: t.approval_reason,
            current_dock_id: t.current_dock_id,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct GatePassResponse {
    pub truck_id: i64,
    /// HS256 token to render as a QR image client-side.
    pub token: String,
}
