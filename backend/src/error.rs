//! Error handling for the StockHub platform
//!
//! Business-rule errors are named outcomes the caller branches on; storage
//! and infrastructure failures propagate unchanged. The core never retries.

use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors: rejected before any state is touched
    #[error("validation error on {field}: {message}")]
    Validation { field: String, message: String },

    // Business rule errors
    #[error("insufficient stock for product {product_id} in warehouse {warehouse_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        warehouse_id: Uuid,
        requested: i64,
        available: i64,
    },

    #[error("invalid transfer transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("no cost basis recorded for product {product_id} in source warehouse {warehouse_id}")]
    SourceCostNotFound {
        product_id: Uuid,
        warehouse_id: Uuid,
    },

    #[error("inventory session {0} is already validated")]
    AlreadyValidated(Uuid),

    #[error("{uncounted} inventory items have not been counted")]
    IncompleteCount { uncounted: usize },

    // Not-found errors
    #[error("transfer {0} not found")]
    TransferNotFound(Uuid),

    #[error("transfer item {0} not found")]
    TransferItemNotFound(Uuid),

    #[error("inventory session {0} not found")]
    SessionNotFound(Uuid),

    #[error("inventory item {0} not found")]
    InventoryItemNotFound(Uuid),

    #[error("resource not found: {0}")]
    NotFound(String),

    // Infrastructure errors: fatal, propagated unchanged
    #[error("configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field-level validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for service operations
pub type AppResult<T> = Result<T, AppError>;
