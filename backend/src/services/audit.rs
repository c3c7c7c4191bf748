//! Audit log service
//!
//! Append-only record of who did what to which entity. Writers treat
//! logging as best-effort; readers query by entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use shared::Pagination;

/// Audit log service
#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

/// Audited action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Movement,
    Transfer,
    Inventory,
    Login,
}

/// Entity kinds an audit entry can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_entity_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditEntityType {
    Product,
    Warehouse,
    User,
    Movement,
    Transfer,
    Inventory,
    Alert,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: AuditAction,
    pub entity_type: AuditEntityType,
    pub entity_id: Uuid,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditLogInput {
    pub user_id: Uuid,
    pub action: AuditAction,
    pub entity_type: AuditEntityType,
    pub entity_id: Uuid,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
}

impl AuditService {
    /// Create a new AuditService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append one audit entry.
    pub async fn log(&self, input: AuditLogInput) -> AppResult<AuditLog> {
        let entry = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (user_id, action, entity_type, entity_id, old_values, new_values)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, action, entity_type, entity_id, old_values, new_values, created_at
            "#,
        )
        .bind(input.user_id)
        .bind(input.action)
        .bind(input.entity_type)
        .bind(input.entity_id)
        .bind(&input.old_values)
        .bind(&input.new_values)
        .fetch_one(&self.db)
        .await?;

        Ok(entry)
    }

    /// Full history for one entity, newest first.
    pub async fn entity_history(
        &self,
        entity_type: AuditEntityType,
        entity_id: Uuid,
        page: Pagination,
    ) -> AppResult<Vec<AuditLog>> {
        let entries = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, user_id, action, entity_type, entity_id, old_values, new_values, created_at
            FROM audit_logs
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}
