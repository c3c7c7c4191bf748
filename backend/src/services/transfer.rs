//! Inter-warehouse transfer service
//!
//! Transfers move stock between warehouses through an explicit workflow:
//! requested quantities are reserved on paper at creation, debited from the
//! source at shipment, and credited to the destination at receipt. A
//! receipt short of what was shipped parks the transfer in `disputed` with
//! a generated reason instead of completing it; a manager later resolves
//! the dispute. Every transition is checked against the state machine and
//! applied under a row lock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::access::AccessService;
use crate::services::alert::{AlertService, AlertType};
use crate::services::audit::{AuditAction, AuditEntityType, AuditLogInput, AuditService};
use crate::services::stock::{record_movement_in_tx, MovementType, RecordMovementInput};
use shared::{
    dispute_reason, effective_sent, validate_distinct_warehouses, validate_has_items,
    validate_positive_quantity, Pagination, Shortfall,
};

/// Inter-warehouse transfer service
#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
    alerts: AlertService,
    access: AccessService,
    audit: AuditService,
}

/// Transfer workflow states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transfer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Approved,
    Rejected,
    Shipped,
    Received,
    Disputed,
    Resolved,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Approved => "approved",
            TransferStatus::Rejected => "rejected",
            TransferStatus::Shipped => "shipped",
            TransferStatus::Received => "received",
            TransferStatus::Disputed => "disputed",
            TransferStatus::Resolved => "resolved",
            TransferStatus::Cancelled => "cancelled",
        }
    }

    /// A terminal status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        allowed_transitions(*self).is_empty()
    }
}

/// States reachable from `from` in one transition.
pub fn allowed_transitions(from: TransferStatus) -> &'static [TransferStatus] {
    use TransferStatus::*;
    match from {
        Pending => &[Approved, Rejected, Cancelled],
        Approved => &[Shipped, Cancelled],
        Shipped => &[Received, Disputed],
        Disputed => &[Resolved],
        Received | Rejected | Resolved | Cancelled => &[],
    }
}

/// Reject the transition unless the state machine allows it.
pub fn assert_transition(from: TransferStatus, to: TransferStatus) -> AppResult<()> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Transfer {
    pub id: Uuid,
    pub source_warehouse_id: Uuid,
    pub destination_warehouse_id: Uuid,
    pub status: TransferStatus,
    pub requested_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub shipped_by: Option<Uuid>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub received_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub dispute_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TransferItem {
    pub id: Uuid,
    pub transfer_id: Uuid,
    pub product_id: Uuid,
    pub quantity_requested: i64,
    pub quantity_sent: Option<i64>,
    pub quantity_received: Option<i64>,
    pub anomaly_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferWithItems {
    pub transfer: Transfer,
    pub items: Vec<TransferItem>,
}

/// One line of a transfer request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransferItem {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransferInput {
    pub source_warehouse_id: Uuid,
    pub destination_warehouse_id: Uuid,
    pub items: Vec<CreateTransferItem>,
    pub notes: Option<String>,
}

/// One line of a receipt: what actually arrived for an item
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiveItemInput {
    pub item_id: Uuid,
    pub quantity_received: i64,
    pub anomaly_notes: Option<String>,
}

/// Filters for listing transfers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferFilters {
    pub status: Option<TransferStatus>,
    pub source_warehouse_id: Option<Uuid>,
    pub destination_warehouse_id: Option<Uuid>,
}

impl TransferService {
    /// Create a new TransferService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            alerts: AlertService::new(db.clone()),
            access: AccessService::new(db.clone()),
            audit: AuditService::new(db.clone()),
            db,
        }
    }

    /// Create a transfer request in `pending` with its items. No stock
    /// moves yet. Notifies users with global scope that an approval is
    /// waiting.
    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateTransferInput,
    ) -> AppResult<TransferWithItems> {
        validate_distinct_warehouses(input.source_warehouse_id, input.destination_warehouse_id)
            .map_err(|m| AppError::validation("destination_warehouse_id", m))?;
        validate_has_items(input.items.len())
            .map_err(|m| AppError::validation("items", m))?;
        for item in &input.items {
            validate_positive_quantity(item.quantity)
                .map_err(|m| AppError::validation("quantity", m))?;
        }

        let mut tx = self.db.begin().await?;

        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            INSERT INTO transfers (source_warehouse_id, destination_warehouse_id, status, requested_by, notes)
            VALUES ($1, $2, 'pending', $3, $4)
            RETURNING id, source_warehouse_id, destination_warehouse_id, status, requested_by,
                      approved_by, approved_at, shipped_by, shipped_at, received_by, received_at,
                      resolved_by, resolved_at, rejection_reason, dispute_reason, notes,
                      created_at, updated_at
            "#,
        )
        .bind(input.source_warehouse_id)
        .bind(input.destination_warehouse_id)
        .bind(user_id)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let row = sqlx::query_as::<_, TransferItem>(
                r#"
                INSERT INTO transfer_items (transfer_id, product_id, quantity_requested)
                VALUES ($1, $2, $3)
                RETURNING id, transfer_id, product_id, quantity_requested, quantity_sent, quantity_received, anomaly_notes
                "#,
            )
            .bind(transfer.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .fetch_one(&mut *tx)
            .await?;
            items.push(row);
        }

        tx.commit().await?;

        self.notify(
            transfer.id,
            AlertType::TransferPending,
            format!("Transfer {} awaits approval", transfer.id),
            self.access.global_scope_users().await.unwrap_or_default(),
        )
        .await;
        self.record_audit(user_id, AuditAction::Create, transfer.id, None, transfer.status)
            .await;

        Ok(TransferWithItems { transfer, items })
    }

    /// Approve a pending transfer. Notifies the requester.
    pub async fn approve(&self, user_id: Uuid, transfer_id: Uuid) -> AppResult<Transfer> {
        let mut tx = self.db.begin().await?;
        let current = lock_transfer(&mut tx, transfer_id).await?;
        assert_transition(current.status, TransferStatus::Approved)?;

        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            UPDATE transfers
            SET status = 'approved', approved_by = $2, approved_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING id, source_warehouse_id, destination_warehouse_id, status, requested_by,
                      approved_by, approved_at, shipped_by, shipped_at, received_by, received_at,
                      resolved_by, resolved_at, rejection_reason, dispute_reason, notes,
                      created_at, updated_at
            "#,
        )
        .bind(transfer_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        self.notify(
            transfer.id,
            AlertType::TransferApproved,
            format!("Transfer {} was approved", transfer.id),
            vec![transfer.requested_by],
        )
        .await;
        self.record_audit(
            user_id,
            AuditAction::Transfer,
            transfer.id,
            Some(current.status),
            transfer.status,
        )
            .await;

        Ok(transfer)
    }

    /// Reject a pending transfer, recording who decided and why.
    /// Notifies the requester.
    pub async fn reject(
        &self,
        user_id: Uuid,
        transfer_id: Uuid,
        reason: String,
    ) -> AppResult<Transfer> {
        let mut tx = self.db.begin().await?;
        let current = lock_transfer(&mut tx, transfer_id).await?;
        assert_transition(current.status, TransferStatus::Rejected)?;

        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            UPDATE transfers
            SET status = 'rejected', approved_by = $2, approved_at = NOW(),
                rejection_reason = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, source_warehouse_id, destination_warehouse_id, status, requested_by,
                      approved_by, approved_at, shipped_by, shipped_at, received_by, received_at,
                      resolved_by, resolved_at, rejection_reason, dispute_reason, notes,
                      created_at, updated_at
            "#,
        )
        .bind(transfer_id)
        .bind(user_id)
        .bind(&reason)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        self.notify(
            transfer.id,
            AlertType::TransferRejected,
            format!("Transfer {} was rejected", transfer.id),
            vec![transfer.requested_by],
        )
        .await;
        self.record_audit(
            user_id,
            AuditAction::Transfer,
            transfer.id,
            Some(current.status),
            transfer.status,
        )
            .await;

        Ok(transfer)
    }

    /// Ship an approved transfer: debit every item's requested quantity
    /// from the source warehouse and stamp it as sent. All debits and the
    /// status change commit together; any insufficient line aborts the
    /// whole shipment. Notifies users attached to the destination.
    pub async fn ship(&self, user_id: Uuid, transfer_id: Uuid) -> AppResult<TransferWithItems> {
        let mut tx = self.db.begin().await?;
        let current = lock_transfer(&mut tx, transfer_id).await?;
        assert_transition(current.status, TransferStatus::Shipped)?;

        let mut items = load_items(&mut tx, transfer_id).await?;

        // Deterministic position lock order across concurrent ships.
        items.sort_by_key(|i| i.product_id);

        for item in &items {
            record_movement_in_tx(
                &mut tx,
                user_id,
                &RecordMovementInput {
                    product_id: item.product_id,
                    warehouse_id: current.source_warehouse_id,
                    movement_type: MovementType::Out,
                    quantity: item.quantity_requested,
                    reason: "transfert".into(),
                    reference: Some(transfer_id.to_string()),
                    unit_cost: None,
                },
            )
            .await?;

            sqlx::query("UPDATE transfer_items SET quantity_sent = $2 WHERE id = $1")
                .bind(item.id)
                .bind(item.quantity_requested)
                .execute(&mut *tx)
                .await?;
        }

        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            UPDATE transfers
            SET status = 'shipped', shipped_by = $2, shipped_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING id, source_warehouse_id, destination_warehouse_id, status, requested_by,
                      approved_by, approved_at, shipped_by, shipped_at, received_by, received_at,
                      resolved_by, resolved_at, rejection_reason, dispute_reason, notes,
                      created_at, updated_at
            "#,
        )
        .bind(transfer_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        let targets = self
            .access
            .warehouse_notification_targets(transfer.destination_warehouse_id)
            .await
            .unwrap_or_default();
        self.notify(
            transfer.id,
            AlertType::TransferShipped,
            format!("Transfer {} was shipped", transfer.id),
            targets,
        )
        .await;
        self.record_audit(
            user_id,
            AuditAction::Transfer,
            transfer.id,
            Some(current.status),
            transfer.status,
        )
            .await;

        let items = self.items(transfer_id).await?;
        Ok(TransferWithItems { transfer, items })
    }

    /// Receive a shipped transfer. Each reported item is credited to the
    /// destination at the source warehouse's average cost; a received
    /// quantity of zero is recorded on the item but creates no movement.
    /// If anything arrived short of what was sent, the transfer lands in
    /// `disputed` with a generated reason instead of `received`. Notifies
    /// users with global scope.
    pub async fn receive(
        &self,
        user_id: Uuid,
        transfer_id: Uuid,
        received: Vec<ReceiveItemInput>,
    ) -> AppResult<TransferWithItems> {
        for item in &received {
            if item.quantity_received < 0 {
                return Err(AppError::validation(
                    "quantity_received",
                    "Received quantity cannot be negative",
                ));
            }
        }

        let mut tx = self.db.begin().await?;
        let current = lock_transfer(&mut tx, transfer_id).await?;
        assert_transition(current.status, TransferStatus::Received)?;

        let mut shortfalls = Vec::new();

        for input in &received {
            let item = sqlx::query_as::<_, TransferItem>(
                r#"
                UPDATE transfer_items
                SET quantity_received = $3, anomaly_notes = COALESCE($4, anomaly_notes)
                WHERE id = $1 AND transfer_id = $2
                RETURNING id, transfer_id, product_id, quantity_requested, quantity_sent, quantity_received, anomaly_notes
                "#,
            )
            .bind(input.item_id)
            .bind(transfer_id)
            .bind(input.quantity_received)
            .bind(&input.anomaly_notes)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::TransferItemNotFound(input.item_id))?;

            // The destination inherits the source warehouse's cost basis.
            let source_cost = sqlx::query_scalar::<_, Decimal>(
                r#"
                SELECT average_cost FROM stock_positions
                WHERE product_id = $1 AND warehouse_id = $2
                "#,
            )
            .bind(item.product_id)
            .bind(current.source_warehouse_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::SourceCostNotFound {
                product_id: item.product_id,
                warehouse_id: current.source_warehouse_id,
            })?;

            if input.quantity_received > 0 {
                record_movement_in_tx(
                    &mut tx,
                    user_id,
                    &RecordMovementInput {
                        product_id: item.product_id,
                        warehouse_id: current.destination_warehouse_id,
                        movement_type: MovementType::In,
                        quantity: input.quantity_received,
                        reason: "transfert".into(),
                        reference: Some(transfer_id.to_string()),
                        unit_cost: Some(source_cost),
                    },
                )
                .await?;
            }

            let sent = effective_sent(item.quantity_sent, item.quantity_requested);
            if input.quantity_received < sent {
                shortfalls.push(Shortfall {
                    product_id: item.product_id,
                    sent,
                    received: input.quantity_received,
                    note: input.anomaly_notes.clone(),
                });
            }
        }

        let (status, reason) = if shortfalls.is_empty() {
            (TransferStatus::Received, None)
        } else {
            (TransferStatus::Disputed, Some(dispute_reason(&shortfalls)))
        };

        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            UPDATE transfers
            SET status = $2, received_by = $3, received_at = NOW(), dispute_reason = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, source_warehouse_id, destination_warehouse_id, status, requested_by,
                      approved_by, approved_at, shipped_by, shipped_at, received_by, received_at,
                      resolved_by, resolved_at, rejection_reason, dispute_reason, notes,
                      created_at, updated_at
            "#,
        )
        .bind(transfer_id)
        .bind(status)
        .bind(user_id)
        .bind(&reason)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        let (alert_type, message) = match status {
            TransferStatus::Disputed => (
                AlertType::TransferDispute,
                format!("Transfer {} is disputed: {}", transfer.id, reason.as_deref().unwrap_or("")),
            ),
            _ => (
                AlertType::TransferReceived,
                format!("Transfer {} was received", transfer.id),
            ),
        };
        self.notify(
            transfer.id,
            alert_type,
            message,
            self.access.global_scope_users().await.unwrap_or_default(),
        )
        .await;
        self.record_audit(
            user_id,
            AuditAction::Transfer,
            transfer.id,
            Some(current.status),
            transfer.status,
        )
            .await;

        let items = self.items(transfer_id).await?;
        Ok(TransferWithItems { transfer, items })
    }

    /// Cancel a transfer before shipment, appending the cancellation to
    /// the notes. Shipped transfers can no longer be cancelled.
    pub async fn cancel(
        &self,
        user_id: Uuid,
        transfer_id: Uuid,
        reason: Option<String>,
    ) -> AppResult<Transfer> {
        let mut tx = self.db.begin().await?;
        let current = lock_transfer(&mut tx, transfer_id).await?;
        assert_transition(current.status, TransferStatus::Cancelled)?;

        let cancellation = match reason {
            Some(r) => format!("Cancelled by {}: {}", user_id, r),
            None => format!("Cancelled by {}", user_id),
        };
        let notes = append_note(current.notes, Some(cancellation));

        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            UPDATE transfers
            SET status = 'cancelled', notes = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, source_warehouse_id, destination_warehouse_id, status, requested_by,
                      approved_by, approved_at, shipped_by, shipped_at, received_by, received_at,
                      resolved_by, resolved_at, rejection_reason, dispute_reason, notes,
                      created_at, updated_at
            "#,
        )
        .bind(transfer_id)
        .bind(&notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        self.record_audit(
            user_id,
            AuditAction::Transfer,
            transfer.id,
            Some(current.status),
            transfer.status,
        )
            .await;

        Ok(transfer)
    }

    /// Close a disputed transfer with a written resolution appended to
    /// the notes. Stock corrections are not made here: the resolver
    /// records any correction as an explicit adjustment movement, so the
    /// ledger keeps its own trail.
    pub async fn resolve_dispute(
        &self,
        user_id: Uuid,
        transfer_id: Uuid,
        resolution: String,
        adjust_stock: bool,
    ) -> AppResult<Transfer> {
        if adjust_stock {
            return Err(AppError::validation(
                "adjust_stock",
                "Automatic stock adjustment on resolution is not supported; record an adjustment movement instead",
            ));
        }

        let mut tx = self.db.begin().await?;
        let current = lock_transfer(&mut tx, transfer_id).await?;
        assert_transition(current.status, TransferStatus::Resolved)?;

        let notes = append_note(current.notes, Some(format!("Resolution: {}", resolution)));

        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            UPDATE transfers
            SET status = 'resolved', resolved_by = $3, resolved_at = NOW(), notes = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, source_warehouse_id, destination_warehouse_id, status, requested_by,
                      approved_by, approved_at, shipped_by, shipped_at, received_by, received_at,
                      resolved_by, resolved_at, rejection_reason, dispute_reason, notes,
                      created_at, updated_at
            "#,
        )
        .bind(transfer_id)
        .bind(&notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        self.record_audit(
            user_id,
            AuditAction::Transfer,
            transfer.id,
            Some(current.status),
            transfer.status,
        )
            .await;

        Ok(transfer)
    }

    /// Fetch a transfer with its items.
    pub async fn get_by_id(&self, transfer_id: Uuid) -> AppResult<TransferWithItems> {
        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            SELECT id, source_warehouse_id, destination_warehouse_id, status, requested_by,
                   approved_by, approved_at, shipped_by, shipped_at, received_by, received_at,
               resolved_by, resolved_at, rejection_reason, dispute_reason, notes,
               created_at, updated_at
            FROM transfers
            WHERE id = $1
            "#,
        )
        .bind(transfer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::TransferNotFound(transfer_id))?;

        let items = self.items(transfer_id).await?;
        Ok(TransferWithItems { transfer, items })
    }

    /// List transfers, newest first.
    pub async fn list(
        &self,
        filters: TransferFilters,
        page: Pagination,
    ) -> AppResult<Vec<Transfer>> {
        let transfers = sqlx::query_as::<_, Transfer>(
            r#"
            SELECT id, source_warehouse_id, destination_warehouse_id, status, requested_by,
                   approved_by, approved_at, shipped_by, shipped_at, received_by, received_at,
               resolved_by, resolved_at, rejection_reason, dispute_reason, notes,
               created_at, updated_at
            FROM transfers
            WHERE ($1::transfer_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR source_warehouse_id = $2)
              AND ($3::uuid IS NULL OR destination_warehouse_id = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filters.status)
        .bind(filters.source_warehouse_id)
        .bind(filters.destination_warehouse_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.db)
        .await?;

        Ok(transfers)
    }

    async fn items(&self, transfer_id: Uuid) -> AppResult<Vec<TransferItem>> {
        let items = sqlx::query_as::<_, TransferItem>(
            r#"
            SELECT id, transfer_id, product_id, quantity_requested, quantity_sent, quantity_received, anomaly_notes
            FROM transfer_items
            WHERE transfer_id = $1
            ORDER BY id
            "#,
        )
        .bind(transfer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    // Alerts and audit entries are best-effort: the workflow transition
    // has already committed when these run.
    async fn notify(
        &self,
        transfer_id: Uuid,
        alert_type: AlertType,
        message: String,
        user_ids: Vec<Uuid>,
    ) {
        if let Err(e) = self
            .alerts
            .create_transfer_alert(transfer_id, alert_type, &message, &user_ids)
            .await
        {
            tracing::warn!("Failed to create alert for transfer {}: {}", transfer_id, e);
        }
    }

    async fn record_audit(
        &self,
        user_id: Uuid,
        action: AuditAction,
        transfer_id: Uuid,
        from: Option<TransferStatus>,
        to: TransferStatus,
    ) {
        let input = AuditLogInput {
            user_id,
            action,
            entity_type: AuditEntityType::Transfer,
            entity_id: transfer_id,
            old_values: from.map(|s| serde_json::json!({ "status": s.as_str() })),
            new_values: Some(serde_json::json!({ "status": to.as_str() })),
        };
        if let Err(e) = self.audit.log(input).await {
            tracing::warn!("Failed to write audit log for transfer {}: {}", transfer_id, e);
        }
    }
}

/// Lock the transfer row for the transaction's duration so concurrent
/// transitions serialize.
async fn lock_transfer(
    tx: &mut Transaction<'_, Postgres>,
    transfer_id: Uuid,
) -> AppResult<Transfer> {
    sqlx::query_as::<_, Transfer>(
        r#"
        SELECT id, source_warehouse_id, destination_warehouse_id, status, requested_by,
               approved_by, approved_at, shipped_by, shipped_at, received_by, received_at,
               resolved_by, resolved_at, rejection_reason, dispute_reason, notes,
               created_at, updated_at
        FROM transfers
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(transfer_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(AppError::TransferNotFound(transfer_id))
}

async fn load_items(
    tx: &mut Transaction<'_, Postgres>,
    transfer_id: Uuid,
) -> AppResult<Vec<TransferItem>> {
    let items = sqlx::query_as::<_, TransferItem>(
        r#"
        SELECT id, transfer_id, product_id, quantity_requested, quantity_sent, quantity_received, anomaly_notes
        FROM transfer_items
        WHERE transfer_id = $1
        ORDER BY id
        "#,
    )
    .bind(transfer_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(items)
}

fn append_note(existing: Option<String>, addition: Option<String>) -> Option<String> {
    match (existing, addition) {
        (Some(n), Some(a)) => Some(format!("{}\n{}", n, a)),
        (None, Some(a)) => Some(a),
        (n, None) => n,
    }
}
