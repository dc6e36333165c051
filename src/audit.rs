// src/audit.rs
//
// Append-only audit writer. Callers pass their open transaction so the
// audit row commits or rolls back together with the status change it
// describes; a lost audit entry never goes unnoticed past a commit.

use serde_json::Value;
use sqlx::PgConnection;

use crate::middleware::auth::AuthContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Scheduling,
    Gate,
    Weighbridge,
    Dock,
    Approval,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Scheduling => "scheduling",
            Category::Gate => "gate",
            Category::Weighbridge => "weighbridge",
            Category::Dock => "dock",
            Category::Approval => "approval",
        }
    }
}

pub async fn record(
    conn: &mut PgConnection,
    category: Category,
    truck_id: Option<i64>,
    auth: &AuthContext,
    action: &str,
    details: Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO audit_log (category, truck_id, actor_id, actor_name, action, details)
        VALUES ($1, $2, $3, $4, $5, $6)"#,
    )
    .bind(category.as_str())
    .bind(truck_id)
    .bind(auth.user_id)
    .bind(&auth.username)
    .bind(action)
    .bind(details)
    .execute(conn)
    .await?;
    Ok(())
}
