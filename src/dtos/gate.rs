use serde::{Deserialize, Serialize};

use crate::dtos::truck::TruckResponse;
use crate::lifecycle::{GateChecks, OperationKind, YardLocation};

#[derive(Deserialize)]
pub struct GateLookupQuery {
    /// Raw truck id.
    pub truck_id: Option<i64>,
    /// Or the QR gate-pass token scanned at the gate.
    pub token: Option<String>,
}

#[derive(Serialize)]
pub struct GateLookupResponse {
    pub truck: TruckResponse,
    pub allowed_events: Vec<&'static str>,
}

#[derive(Deserialize)]
pub struct VerifyTruckRequest {
    pub checks: GateChecks,
    pub location: YardLocation,
    /// Required when location is "dock".
    pub dock_id: Option<i64>,
    /// Loading or unloading, required when location is "dock".
    pub operation_kind: Option<OperationKind>,
}

#[derive(Deserialize)]
pub struct RejectTruckRequest {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct HoldForApprovalRequest {
    pub checks: GateChecks,
    pub reason: Option<String>,
}
