//! StockHub backend entrypoint
//!
//! Loads configuration, connects to PostgreSQL, applies migrations, and
//! reports the pool ready. The service layer in `stockhub_backend` is
//! consumed from here by whatever surface embeds it.

use stockhub_backend::{connect_database, init_tracing, run_migrations, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::load()?;

    tracing::info!("Starting StockHub backend");
    tracing::info!("Environment: {}", config.environment);

    tracing::info!("Connecting to database...");
    let db = connect_database(&config.database).await?;
    tracing::info!("Database connection established");

    run_migrations(&db).await?;
    tracing::info!("Migrations applied");

    Ok(())
}
