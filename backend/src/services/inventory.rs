//! Physical inventory reconciliation service
//!
//! A session snapshots the ledger quantities for a warehouse, collects
//! physical counts item by item, and on validation writes corrective
//! adjustment movements so the ledger agrees with the floor. Validation is
//! the only step that touches stock, and it is all-or-nothing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::alert::AlertService;
use crate::services::audit::{AuditAction, AuditEntityType, AuditLogInput, AuditService};
use crate::services::stock::{record_movement_in_tx, MovementType, RecordMovementInput};
use shared::{validate_counted_quantity, Pagination};

/// Inventory reconciliation service
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
    alerts: AlertService,
    audit: AuditService,
}

/// Inventory session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "inventory_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Validated,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventorySession {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub status: SessionStatus,
    pub started_by: Uuid,
    pub validated_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

/// One product line of a session. `system_quantity` is frozen at session
/// creation; the live position may drift until validation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryItem {
    pub id: Uuid,
    pub session_id: Uuid,
    pub product_id: Uuid,
    pub system_quantity: i64,
    pub counted_quantity: Option<i64>,
    pub difference: Option<i64>,
    pub counted_by: Option<Uuid>,
    pub counted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionWithItems {
    pub session: InventorySession,
    pub items: Vec<InventoryItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionInput {
    pub warehouse_id: Uuid,
    /// Restrict the session to these products; None counts everything
    /// with a position in the warehouse.
    pub product_ids: Option<Vec<Uuid>>,
    pub notes: Option<String>,
}

/// Filters for listing sessions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionFilters {
    pub warehouse_id: Option<Uuid>,
    pub status: Option<SessionStatus>,
}

/// Movement that reconciles a counted difference, if any. A surplus
/// becomes an adjustment in, a deficit an adjustment out, a zero
/// difference nothing.
pub fn corrective_movement(difference: i64) -> Option<(MovementType, i64)> {
    match difference {
        0 => None,
        d if d > 0 => Some((MovementType::AdjustmentIn, d)),
        d => Some((MovementType::AdjustmentOut, -d)),
    }
}

/// Gate a session must pass before validation: still in progress, and
/// every item carries a count.
pub fn validation_gate(
    session_id: Uuid,
    status: SessionStatus,
    items: &[InventoryItem],
) -> AppResult<()> {
    if status == SessionStatus::Validated {
        return Err(AppError::AlreadyValidated(session_id));
    }

    let uncounted = items.iter().filter(|i| i.counted_quantity.is_none()).count();
    if uncounted > 0 {
        return Err(AppError::IncompleteCount { uncounted });
    }

    Ok(())
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            alerts: AlertService::new(db.clone()),
            audit: AuditService::new(db.clone()),
            db,
        }
    }

    /// Open a counting session, snapshotting the current ledger quantity
    /// of every product in scope. Notifies users attached to the
    /// warehouse that a count has started.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        input: CreateSessionInput,
    ) -> AppResult<SessionWithItems> {
        let mut tx = self.db.begin().await?;

        let session = sqlx::query_as::<_, InventorySession>(
            r#"
            INSERT INTO inventory_sessions (warehouse_id, status, started_by, notes)
            VALUES ($1, 'in_progress', $2, $3)
            RETURNING id, warehouse_id, status, started_by, validated_by, notes, created_at, validated_at
            "#,
        )
        .bind(input.warehouse_id)
        .bind(user_id)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            INSERT INTO inventory_items (session_id, product_id, system_quantity)
            SELECT $1, product_id, quantity
            FROM stock_positions
            WHERE warehouse_id = $3
              AND ($2::uuid[] IS NULL OR product_id = ANY($2))
            RETURNING id, session_id, product_id, system_quantity, counted_quantity, difference, counted_by, counted_at
            "#,
        )
        .bind(session.id)
        .bind(&input.product_ids)
        .bind(input.warehouse_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        if let Err(e) = self
            .alerts
            .create_inventory_alert(
                session.warehouse_id,
                &format!("Inventory count {} started", session.id),
            )
            .await
        {
            tracing::warn!("Failed to create alert for inventory session {}: {}", session.id, e);
        }

        Ok(SessionWithItems { session, items })
    }

    /// Record a physical count for one item. Counting the same item again
    /// overwrites the previous count; the difference against the frozen
    /// snapshot is recomputed each time. Items of a validated session can
    /// no longer be counted.
    pub async fn record_count(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        counted_quantity: i64,
    ) -> AppResult<InventoryItem> {
        validate_counted_quantity(counted_quantity)
            .map_err(|m| AppError::validation("counted_quantity", m))?;

        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            UPDATE inventory_items
            SET counted_quantity = $2,
                difference = $2 - system_quantity,
                counted_by = $3,
                counted_at = NOW()
            WHERE id = $1
              AND session_id IN (SELECT id FROM inventory_sessions WHERE status = 'in_progress')
            RETURNING id, session_id, product_id, system_quantity, counted_quantity, difference, counted_by, counted_at
            "#,
        )
        .bind(item_id)
        .bind(counted_quantity)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        match item {
            Some(item) => Ok(item),
            // Distinguish an unknown item from one whose session is closed.
            None => {
                let validated_session = sqlx::query_scalar::<_, Uuid>(
                    r#"
                    SELECT s.id
                    FROM inventory_items i
                    JOIN inventory_sessions s ON s.id = i.session_id
                    WHERE i.id = $1 AND s.status = 'validated'
                    "#,
                )
                .bind(item_id)
                .fetch_optional(&self.db)
                .await?;

                match validated_session {
                    Some(session_id) => Err(AppError::AlreadyValidated(session_id)),
                    None => Err(AppError::InventoryItemNotFound(item_id)),
                }
            }
        }
    }

    /// Validate a fully counted session: write one corrective adjustment
    /// movement per non-zero difference and close the session, atomically.
    /// Surplus stock enters at the position's current average cost so
    /// validation never invents a new cost basis.
    pub async fn validate(&self, user_id: Uuid, session_id: Uuid) -> AppResult<SessionWithItems> {
        let mut tx = self.db.begin().await?;

        let session = sqlx::query_as::<_, InventorySession>(
            r#"
            SELECT id, warehouse_id, status, started_by, validated_by, notes, created_at, validated_at
            FROM inventory_sessions
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::SessionNotFound(session_id))?;

        let mut items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT id, session_id, product_id, system_quantity, counted_quantity, difference, counted_by, counted_at
            FROM inventory_items
            WHERE session_id = $1
            ORDER BY id
            "#,
        )
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await?;

        validation_gate(session_id, session.status, &items)?;

        // Deterministic position lock order across concurrent validations.
        items.sort_by_key(|i| i.product_id);

        for item in &items {
            let Some((movement_type, quantity)) =
                item.difference.and_then(corrective_movement)
            else {
                continue;
            };

            let unit_cost = if movement_type == MovementType::AdjustmentIn {
                let cost = sqlx::query_scalar::<_, Decimal>(
                    r#"
                    SELECT average_cost FROM stock_positions
                    WHERE product_id = $1 AND warehouse_id = $2
                    "#,
                )
                .bind(item.product_id)
                .bind(session.warehouse_id)
                .fetch_optional(&mut *tx)
                .await?;
                Some(cost.unwrap_or(Decimal::ZERO))
            } else {
                None
            };

            record_movement_in_tx(
                &mut tx,
                user_id,
                &RecordMovementInput {
                    product_id: item.product_id,
                    warehouse_id: session.warehouse_id,
                    movement_type,
                    quantity,
                    reason: "adjustment".into(),
                    reference: Some(session_id.to_string()),
                    unit_cost,
                },
            )
            .await?;
        }

        let session = sqlx::query_as::<_, InventorySession>(
            r#"
            UPDATE inventory_sessions
            SET status = 'validated', validated_by = $2, validated_at = NOW()
            WHERE id = $1
            RETURNING id, warehouse_id, status, started_by, validated_by, notes, created_at, validated_at
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let input = AuditLogInput {
            user_id,
            action: AuditAction::Inventory,
            entity_type: AuditEntityType::Inventory,
            entity_id: session_id,
            old_values: None,
            new_values: Some(serde_json::json!({
                "warehouse_id": session.warehouse_id,
                "status": "validated",
                "items": items.len(),
            })),
        };
        if let Err(e) = self.audit.log(input).await {
            tracing::warn!("Failed to write audit log for inventory session {}: {}", session_id, e);
        }

        let items = self.session_items(session_id).await?;
        Ok(SessionWithItems { session, items })
    }

    /// Fetch a session with its items.
    pub async fn get_by_id(&self, session_id: Uuid) -> AppResult<SessionWithItems> {
        let session = sqlx::query_as::<_, InventorySession>(
            r#"
            SELECT id, warehouse_id, status, started_by, validated_by, notes, created_at, validated_at
            FROM inventory_sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::SessionNotFound(session_id))?;

        let items = self.session_items(session_id).await?;
        Ok(SessionWithItems { session, items })
    }

    /// List sessions, newest first.
    pub async fn list(
        &self,
        filters: SessionFilters,
        page: Pagination,
    ) -> AppResult<Vec<InventorySession>> {
        let sessions = sqlx::query_as::<_, InventorySession>(
            r#"
            SELECT id, warehouse_id, status, started_by, validated_by, notes, created_at, validated_at
            FROM inventory_sessions
            WHERE ($1::uuid IS NULL OR warehouse_id = $1)
              AND ($2::inventory_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filters.warehouse_id)
        .bind(filters.status)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.db)
        .await?;

        Ok(sessions)
    }

    async fn session_items(&self, session_id: Uuid) -> AppResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT id, session_id, product_id, system_quantity, counted_quantity, difference, counted_by, counted_at
            FROM inventory_items
            WHERE session_id = $1
            ORDER BY id
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }
}
