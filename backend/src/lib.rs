//! StockHub - Multi-Warehouse Stock Management Core
//!
//! Service layer for tracking stock quantities and weighted-average cost
//! across warehouses, driving inter-warehouse transfers through an
//! approval/shipment/receipt workflow, and reconciling physical inventory
//! counts against the ledger. HTTP framing, authentication, and UI live in
//! the layers embedding this crate.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;
pub mod error;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};

/// Create the database connection pool.
pub async fn connect_database(config: &config::DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.url)
        .await
}

/// Apply pending database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Initialize tracing for an embedding binary. Panics if a global
/// subscriber is already set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockhub_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
