use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::registers::RegisterField;

#[derive(Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<RegisterField>,
}

#[derive(Deserialize)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub fields: Option<Vec<RegisterField>>,
    pub is_active: Option<bool>,
}

#[derive(Serialize)]
pub struct TemplateResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<RegisterField>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct CreateEntryRequest {
    pub truck_id: Option<i64>,
    pub data: Map<String, Value>,
}

#[derive(Serialize)]
pub struct EntryResponse {
    pub id: i64,
    pub template_id: i64,
    pub truck_id: Option<i64>,
    pub data: Value,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}
