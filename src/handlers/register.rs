use axum::{extract::State, Json};
use axum::http::StatusCode;
use axum::extract::{Extension, Path, Query};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use sqlx::FromRow;

use crate::dtos::register::{
    CreateEntryRequest, CreateTemplateRequest, EntryResponse, TemplateResponse,
    UpdateTemplateRequest,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::registers::{validate_entry, validate_template, RegisterField};
use crate::state::AppState;

#[derive(Debug, FromRow)]
struct TemplateRow {
    id: i64,
    name: String,
    description: Option<String>,
    fields: Value,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TemplateRow {
    fn fields(&self) -> Result<Vec<RegisterField>, AppError> {
        serde_json::from_value(self.fields.clone())
            .map_err(|e| AppError::internal(format!("Corrupt template fields: {e}")))
    }

    fn into_response(self) -> Result<TemplateResponse, AppError> {
        let fields = self.fields()?;
        Ok(TemplateResponse {
            id: self.id,
            name: self.name,
            description: self.description,
            fields,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct EntryRow {
    id: i64,
    template_id: i64,
    truck_id: Option<i64>,
    data: Value,
    created_by: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<EntryRow> for EntryResponse {
    fn from(e: EntryRow) -> Self {
        EntryResponse {
            id: e.id,
            template_id: e.template_id,
            truck_id: e.truck_id,
            data: e.data,
            created_by: e.created_by,
            created_at: e.created_at,
        }
    }
}

pub async fn create_template(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<TemplateResponse>), AppError> {
    if !auth.has_role(&["supervisor"]) {
        return Err(AppError::forbidden("Only supervisors can create register templates"));
    }
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Template name is required"));
    }
    validate_template(&req.fields).map_err(AppError::validation)?;

    let fields = serde_json::to_value(&req.fields)
        .map_err(|e| AppError::internal(format!("Field serialization failed: {e}")))?;

    let template = sqlx::query_as::<_, TemplateRow>(
        r#"INSERT INTO register_templates (name, description, fields, created_by)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, description, fields, is_active, created_at"#,
    )
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(fields)
    .bind(auth.user_id)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        if let Some(db) = e.as_database_error() {
            if db.code().as_deref() == Some("23505") {
                return AppError::conflict("Template name already exists");
            }
        }
        AppError::db(e)
    })?;

    Ok((StatusCode::CREATED, Json(template.into_response()?)))
}

pub async fn list_templates(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
) -> Result<Json<Vec<TemplateResponse>>, AppError> {
    let rows = sqlx::query_as::<_, TemplateRow>(
        r#"SELECT id, name, description, fields, is_active, created_at
        FROM register_templates ORDER BY name ASC"#,
    )
    .fetch_all(&db_pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(row.into_response()?);
    }
    Ok(Json(out))
}

pub async fn get_template(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<TemplateResponse>, AppError> {
    let row = sqlx::query_as::<_, TemplateRow>(
        r#"SELECT id, name, description, fields, is_active, created_at
        FROM register_templates WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Register template not found"))?;

    Ok(Json(row.into_response()?))
}

pub async fn update_template(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTemplateRequest>,
) -> Result<Json<TemplateResponse>, AppError> {
    if !auth.has_role(&["supervisor"]) {
        return Err(AppError::forbidden("Only supervisors can edit register templates"));
    }

    let fields = match &req.fields {
        Some(fields) => {
            validate_template(fields).map_err(AppError::validation)?;
            Some(
                serde_json::to_value(fields)
                    .map_err(|e| AppError::internal(format!("Field serialization failed: {e}")))?,
            )
        }
        None => None,
    };

    let row = sqlx::query_as::<_, TemplateRow>(
        r#"UPDATE register_templates SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            fields = COALESCE($4, fields),
            is_active = COALESCE($5, is_active)
        WHERE id = $1
        RETURNING id, name, description, fields, is_active, created_at"#,
    )
    .bind(id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(fields)
    .bind(req.is_active)
    .fetch_optional(&db_pool)
    .await
    .map_err(|e| {
        if let Some(db) = e.as_database_error() {
            if db.code().as_deref() == Some("23505") {
                return AppError::conflict("Template name already exists");
            }
        }
        AppError::db(e)
    })?
    .ok_or_else(|| AppError::not_found("Register template not found"))?;

    Ok(Json(row.into_response()?))
}

pub async fn create_entry(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(template_id): Path<i64>,
    Json(req): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<EntryResponse>), AppError> {
    let template = sqlx::query_as::<_, TemplateRow>(
        r#"SELECT id, name, description, fields, is_active, created_at
        FROM register_templates WHERE id = $1"#,
    )
    .bind(template_id)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Register template not found"))?;

    if !template.is_active {
        return Err(AppError::conflict("Register template is inactive"));
    }

    let fields = template.fields()?;
    validate_entry(&fields, &req.data).map_err(AppError::validation)?;

    if let Some(truck_id) = req.truck_id {
        let exists = sqlx::query_as::<_, (bool,)>(
            r#"SELECT EXISTS(SELECT 1 FROM trucks WHERE id = $1)"#,
        )
        .bind(truck_id)
        .fetch_one(&db_pool)
        .await?;
        if !exists.0 {
            return Err(AppError::validation("Invalid truck_id"));
        }
    }

    let entry = sqlx::query_as::<_, EntryRow>(
        r#"INSERT INTO register_entries (template_id, truck_id, data, created_by)
        VALUES ($1, $2, $3, $4)
        RETURNING id, template_id, truck_id, data, created_by, created_at"#,
    )
    .bind(template_id)
    .bind(req.truck_id)
    .bind(Value::Object(req.data))
    .bind(auth.user_id)
    .fetch_one(&db_pool)
    .await?;

    Ok((StatusCode::CREATED, Json(entry.into())))
}

#[derive(Deserialize)]
pub struct ListEntriesQuery {
    pub truck_id: Option<i64>,
}

pub async fn list_entries(
    State(AppState { db_pool }): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path(template_id): Path<i64>,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<Vec<EntryResponse>>, AppError> {
    let entries = sqlx::query_as::<_, EntryRow>(
        r#"SELECT id, template_id, truck_id, data, created_by, created_at
        FROM register_entries
        WHERE template_id = $1
          AND ($2::BIGINT IS NULL OR truck_id = $2)
        ORDER BY created_at DESC"#,
    )
    .bind(template_id)
    .bind(query.truck_id)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
