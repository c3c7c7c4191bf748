//! In-app alert service
//!
//! Alerts are per-user rows with a read flag. Producers are the other
//! services: low-stock checks after movements, transfer workflow
//! transitions, and inventory session starts. Low-stock alerts are
//! deduplicated so a user is not re-alerted while an unread alert for the
//! same position is still pending.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::access::AccessService;
use shared::Pagination;

/// Alert service
#[derive(Clone)]
pub struct AlertService {
    db: PgPool,
    access: AccessService,
}

/// Alert types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "alert_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    TransferPending,
    TransferApproved,
    TransferRejected,
    TransferShipped,
    TransferReceived,
    TransferDispute,
    InventoryStarted,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub transfer_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlertInput {
    pub user_id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub transfer_id: Option<Uuid>,
}

impl AlertService {
    /// Create a new AlertService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            access: AccessService::new(db.clone()),
            db,
        }
    }

    /// Insert one alert row.
    pub async fn create_alert(&self, input: CreateAlertInput) -> AppResult<Alert> {
        let alert = sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts (user_id, alert_type, message, product_id, warehouse_id, transfer_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, alert_type, message, product_id, warehouse_id, transfer_id, is_read, created_at
            "#,
        )
        .bind(input.user_id)
        .bind(input.alert_type)
        .bind(&input.message)
        .bind(input.product_id)
        .bind(input.warehouse_id)
        .bind(input.transfer_id)
        .fetch_one(&self.db)
        .await?;

        Ok(alert)
    }

    /// Low-stock alert for everyone watching the warehouse, skipping users
    /// who still have an unread low-stock alert for the same position.
    pub async fn create_stock_alert(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        current_quantity: i64,
        threshold: i64,
    ) -> AppResult<()> {
        let targets = self.access.warehouse_notification_targets(warehouse_id).await?;
        let message = format!(
            "Low stock: quantity {} at or below threshold {}",
            current_quantity, threshold
        );

        for user_id in targets {
            let pending = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM alerts
                    WHERE user_id = $1 AND alert_type = 'low_stock'
                      AND product_id = $2 AND warehouse_id = $3
                      AND is_read = FALSE
                )
                "#,
            )
            .bind(user_id)
            .bind(product_id)
            .bind(warehouse_id)
            .fetch_one(&self.db)
            .await?;

            if pending {
                continue;
            }

            self.create_alert(CreateAlertInput {
                user_id,
                alert_type: AlertType::LowStock,
                message: message.clone(),
                product_id: Some(product_id),
                warehouse_id: Some(warehouse_id),
                transfer_id: None,
            })
            .await?;
        }

        Ok(())
    }

    /// Transfer workflow alert delivered to an explicit recipient list.
    pub async fn create_transfer_alert(
        &self,
        transfer_id: Uuid,
        alert_type: AlertType,
        message: &str,
        user_ids: &[Uuid],
    ) -> AppResult<()> {
        for user_id in user_ids {
            self.create_alert(CreateAlertInput {
                user_id: *user_id,
                alert_type,
                message: message.to_string(),
                product_id: None,
                warehouse_id: None,
                transfer_id: Some(transfer_id),
            })
            .await?;
        }

        Ok(())
    }

    /// Inventory alert for everyone watching the warehouse.
    pub async fn create_inventory_alert(&self, warehouse_id: Uuid, message: &str) -> AppResult<()> {
        let targets = self.access.warehouse_notification_targets(warehouse_id).await?;

        for user_id in targets {
            self.create_alert(CreateAlertInput {
                user_id,
                alert_type: AlertType::InventoryStarted,
                message: message.to_string(),
                product_id: None,
                warehouse_id: Some(warehouse_id),
                transfer_id: None,
            })
            .await?;
        }

        Ok(())
    }

    /// A user's alerts, newest first, optionally unread only.
    pub async fn user_alerts(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: Pagination,
    ) -> AppResult<Vec<Alert>> {
        let alerts = sqlx::query_as::<_, Alert>(
            r#"
            SELECT id, user_id, alert_type, message, product_id, warehouse_id, transfer_id, is_read, created_at
            FROM alerts
            WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.db)
        .await?;

        Ok(alerts)
    }

    /// Number of unread alerts for a user.
    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM alerts WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Mark one alert as read. The user scope keeps users from touching
    /// each other's alerts.
    pub async fn mark_as_read(&self, user_id: Uuid, alert_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE alerts SET is_read = TRUE WHERE id = $1 AND user_id = $2",
        )
        .bind(alert_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("alert {}", alert_id)));
        }

        Ok(())
    }

    /// Mark all of a user's alerts as read, returning how many changed.
    pub async fn mark_all_as_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE alerts SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}
