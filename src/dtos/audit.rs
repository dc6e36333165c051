use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Deserialize)]
pub struct ListAuditQuery {
    pub truck_id: Option<i64>,
    pub category: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct AuditEntryResponse {
    pub id: i64,
    pub category: String,
    pub truck_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub actor_name: String,
    pub action: String,
    pub details: Option<Value>,
    pub created_at: DateTime<Utc>,
}
