//! Stock ledger service
//!
//! Sole owner of stock positions and movements. Every quantity or cost
//! mutation in the system goes through `record_movement`: a single atomic
//! read-compute-write against one (product, warehouse) position row plus an
//! immutable movement record. Costing follows the weighted-average method,
//! resetting to the incoming unit cost whenever a position has been fully
//! depleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::alert::AlertService;
use shared::{at_or_below_threshold, weighted_average_cost, Pagination};

/// Stock ledger service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
    alerts: AlertService,
}

/// Stock movement types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "movement_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    In,
    Out,
    AdjustmentIn,
    AdjustmentOut,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
            MovementType::AdjustmentIn => "adjustment_in",
            MovementType::AdjustmentOut => "adjustment_out",
        }
    }

    pub fn is_inbound(&self) -> bool {
        matches!(self, MovementType::In | MovementType::AdjustmentIn)
    }

    pub fn is_outbound(&self) -> bool {
        !self.is_inbound()
    }
}

/// Immutable ledger entry recording one quantity change to one position
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Movement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
    pub reference: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Current quantity and cost basis for one (product, warehouse) pair
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockPosition {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i64,
    pub average_cost: Decimal,
    pub min_stock: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a stock movement
#[derive(Debug, Clone, Deserialize)]
pub struct RecordMovementInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
    pub reference: Option<String>,
    /// Unit cost of the incoming stock; required for inbound movements.
    pub unit_cost: Option<Decimal>,
}

/// Per-warehouse stock row for one product
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WarehouseStock {
    pub warehouse_id: Uuid,
    pub quantity: i64,
    pub average_cost: Decimal,
    pub min_stock: Option<i64>,
    pub valuation: Decimal,
}

/// Consolidated stock for one product across all warehouses
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConsolidatedStock {
    pub total_quantity: i64,
    pub total_value: Decimal,
}

/// Result of a low-stock threshold check
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdCheck {
    pub current_quantity: i64,
    pub threshold: i64,
    pub is_below_threshold: bool,
}

/// Filters for listing movement history
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilters {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
}

/// Quantity and cost of a position, before or after a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionState {
    pub quantity: i64,
    pub average_cost: Decimal,
}

impl PositionState {
    /// State of a position that has never seen a movement.
    pub fn empty() -> Self {
        Self {
            quantity: 0,
            average_cost: Decimal::ZERO,
        }
    }
}

/// Apply one movement to a position state, enforcing the ledger rules:
/// positive quantities only, no over-debit, inbound movements carry a unit
/// cost that blends into (or, on a depleted position, replaces) the
/// weighted average, outbound movements never touch cost.
pub fn apply_movement(
    product_id: Uuid,
    warehouse_id: Uuid,
    state: PositionState,
    movement_type: MovementType,
    quantity: i64,
    unit_cost: Option<Decimal>,
) -> AppResult<PositionState> {
    if quantity <= 0 {
        return Err(AppError::validation("quantity", "Quantity must be positive"));
    }

    if movement_type.is_outbound() {
        if quantity > state.quantity {
            return Err(AppError::InsufficientStock {
                product_id,
                warehouse_id,
                requested: quantity,
                available: state.quantity,
            });
        }
        return Ok(PositionState {
            quantity: state.quantity - quantity,
            average_cost: state.average_cost,
        });
    }

    let unit_cost = match unit_cost {
        Some(cost) if cost >= Decimal::ZERO => cost,
        Some(_) => {
            return Err(AppError::validation(
                "unit_cost",
                "Unit cost cannot be negative",
            ))
        }
        None => {
            return Err(AppError::validation(
                "unit_cost",
                "Unit cost is required for inbound movements",
            ))
        }
    };

    Ok(PositionState {
        quantity: state.quantity + quantity,
        average_cost: weighted_average_cost(
            state.quantity,
            state.average_cost,
            quantity,
            unit_cost,
        ),
    })
}

/// Record a movement against a caller-owned transaction. Used by the
/// transfer and inventory services so that multi-item operations commit or
/// roll back as a whole. Locks the position row for the duration of the
/// read-compute-write.
pub(crate) async fn record_movement_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    input: &RecordMovementInput,
) -> AppResult<Movement> {
    let current = sqlx::query_as::<_, (i64, Decimal)>(
        r#"
        SELECT quantity, average_cost
        FROM stock_positions
        WHERE product_id = $1 AND warehouse_id = $2
        FOR UPDATE
        "#,
    )
    .bind(input.product_id)
    .bind(input.warehouse_id)
    .fetch_optional(&mut **tx)
    .await?;

    let state = current
        .map(|(quantity, average_cost)| PositionState {
            quantity,
            average_cost,
        })
        .unwrap_or_else(PositionState::empty);

    let next = apply_movement(
        input.product_id,
        input.warehouse_id,
        state,
        input.movement_type,
        input.quantity,
        input.unit_cost,
    )?;

    sqlx::query(
        r#"
        INSERT INTO stock_positions (product_id, warehouse_id, quantity, average_cost)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (product_id, warehouse_id)
        DO UPDATE SET quantity = $3, average_cost = $4, updated_at = NOW()
        "#,
    )
    .bind(input.product_id)
    .bind(input.warehouse_id)
    .bind(next.quantity)
    .bind(next.average_cost)
    .execute(&mut **tx)
    .await?;

    let movement = sqlx::query_as::<_, Movement>(
        r#"
        INSERT INTO stock_movements (product_id, warehouse_id, movement_type, quantity, reason, reference, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, product_id, warehouse_id, movement_type, quantity, reason, reference, user_id, created_at
        "#,
    )
    .bind(input.product_id)
    .bind(input.warehouse_id)
    .bind(input.movement_type)
    .bind(input.quantity)
    .bind(&input.reason)
    .bind(&input.reference)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(movement)
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            alerts: AlertService::new(db.clone()),
            db,
        }
    }

    /// Record a stock movement: update the position (quantity and
    /// weighted-average cost) and append the immutable ledger entry, as one
    /// atomic unit. After the commit, fires a best-effort low-stock alert
    /// when the position sits at or below its threshold.
    pub async fn record_movement(
        &self,
        user_id: Uuid,
        input: RecordMovementInput,
    ) -> AppResult<Movement> {
        if input.quantity <= 0 {
            return Err(AppError::validation("quantity", "Quantity must be positive"));
        }
        if input.movement_type.is_inbound() && input.unit_cost.is_none() {
            return Err(AppError::validation(
                "unit_cost",
                "Unit cost is required for inbound movements",
            ));
        }

        let mut tx = self.db.begin().await?;
        let movement = record_movement_in_tx(&mut tx, user_id, &input).await?;
        tx.commit().await?;

        // Low-stock alerting is best-effort: a failure here never fails the
        // movement that triggered it.
        match self.check_threshold(input.product_id, input.warehouse_id).await {
            Ok(Some(check)) if check.is_below_threshold => {
                if let Err(e) = self
                    .alerts
                    .create_stock_alert(
                        input.product_id,
                        input.warehouse_id,
                        check.current_quantity,
                        check.threshold,
                    )
                    .await
                {
                    tracing::warn!(
                        "Failed to create low-stock alert for product {} in warehouse {}: {}",
                        input.product_id,
                        input.warehouse_id,
                        e
                    );
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    "Failed to check stock threshold for product {} in warehouse {}: {}",
                    input.product_id,
                    input.warehouse_id,
                    e
                );
            }
        }

        Ok(movement)
    }

    /// Get the position for a (product, warehouse) pair. Absent means no
    /// movement was ever recorded: quantity 0, no cost basis.
    pub async fn get_position(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<Option<StockPosition>> {
        let position = sqlx::query_as::<_, StockPosition>(
            r#"
            SELECT product_id, warehouse_id, quantity, average_cost, min_stock, updated_at
            FROM stock_positions
            WHERE product_id = $1 AND warehouse_id = $2
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(position)
    }

    /// Per-warehouse stock rows for a product, with valuation.
    pub async fn get_stock_by_warehouse(&self, product_id: Uuid) -> AppResult<Vec<WarehouseStock>> {
        let rows = sqlx::query_as::<_, WarehouseStock>(
            r#"
            SELECT warehouse_id, quantity, average_cost, min_stock,
                   quantity * average_cost AS valuation
            FROM stock_positions
            WHERE product_id = $1
            ORDER BY warehouse_id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Total quantity and value of a product across all warehouses.
    pub async fn get_consolidated(&self, product_id: Uuid) -> AppResult<ConsolidatedStock> {
        let consolidated = sqlx::query_as::<_, ConsolidatedStock>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::bigint AS total_quantity,
                   COALESCE(SUM(quantity * average_cost), 0) AS total_value
            FROM stock_positions
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        Ok(consolidated)
    }

    /// Total stock value, optionally restricted to one warehouse.
    pub async fn get_valuation(&self, warehouse_id: Option<Uuid>) -> AppResult<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(quantity * average_cost), 0)
            FROM stock_positions
            WHERE ($1::uuid IS NULL OR warehouse_id = $1)
            "#,
        )
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        Ok(total)
    }

    /// Low-stock check for a position. The threshold is the position-level
    /// override if set, else the product-level default, else 0. Returns
    /// None when the position does not exist.
    pub async fn check_threshold(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<Option<ThresholdCheck>> {
        let position = sqlx::query_as::<_, (i64, Option<i64>)>(
            r#"
            SELECT quantity, min_stock
            FROM stock_positions
            WHERE product_id = $1 AND warehouse_id = $2
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?;

        let Some((quantity, position_min)) = position else {
            return Ok(None);
        };

        let product_min = sqlx::query_scalar::<_, i64>(
            "SELECT min_stock FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        let threshold = position_min.or(product_min).unwrap_or(0);

        Ok(Some(ThresholdCheck {
            current_quantity: quantity,
            threshold,
            is_below_threshold: at_or_below_threshold(quantity, threshold),
        }))
    }

    /// Movement history, newest first, over the indexed columns.
    pub async fn list_movements(
        &self,
        filters: MovementFilters,
        page: Pagination,
    ) -> AppResult<Vec<Movement>> {
        let movements = sqlx::query_as::<_, Movement>(
            r#"
            SELECT id, product_id, warehouse_id, movement_type, quantity, reason, reference, user_id, created_at
            FROM stock_movements
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
              AND ($3::movement_type IS NULL OR movement_type = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filters.product_id)
        .bind(filters.warehouse_id)
        .bind(filters.movement_type)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.db)
        .await?;

        Ok(movements)
    }
}
