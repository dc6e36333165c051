use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Deserialize)]
pub struct ResolveApprovalRequest {
    /// "approved" or "rejected".
    pub decision: String,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ListApprovalsQuery {
    pub status: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct ApprovalRequestResponse {
    pub id: i64,
    pub kind: String,
    pub status: String,
    pub truck_id: i64,
    pub weighbridge_entry_id: Option<i64>,
    pub reason: Option<String>,
    pub data: Option<Value>,
    pub requested_by: Option<i64>,
    pub resolved_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}
