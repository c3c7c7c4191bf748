//! Warehouse scoping and notification targeting
//!
//! Role semantics live in `shared::Role`; this service only answers who
//! should hear about events: users whose role spans every warehouse, plus
//! users explicitly attached to a given warehouse.

use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use shared::Role;

/// Access scoping service
#[derive(Clone)]
pub struct AccessService {
    db: PgPool,
}

impl AccessService {
    /// Create a new AccessService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Active users whose role grants visibility across all warehouses.
    pub async fn global_scope_users(&self) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, role FROM users WHERE is_active = TRUE",
        )
        .fetch_all(&self.db)
        .await?;

        // Unknown role strings are skipped rather than failing the caller.
        Ok(rows
            .into_iter()
            .filter(|(_, role)| {
                role.parse::<Role>()
                    .map(|r| r.has_global_scope())
                    .unwrap_or(false)
            })
            .map(|(id, _)| id)
            .collect())
    }

    /// Users who should be notified about events in a warehouse: globally
    /// scoped users plus users attached to the warehouse, deduplicated.
    pub async fn warehouse_notification_targets(&self, warehouse_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut targets: HashSet<Uuid> = self.global_scope_users().await?.into_iter().collect();

        let attached = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT uw.user_id
            FROM user_warehouses uw
            JOIN users u ON u.id = uw.user_id
            WHERE uw.warehouse_id = $1 AND u.is_active = TRUE
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        targets.extend(attached);
        Ok(targets.into_iter().collect())
    }
}
