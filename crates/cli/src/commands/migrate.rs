//! Database migration command.

use meridian_store::postgres::MIGRATOR;
use meridian_store::create_pool;

use crate::config::CrmConfig;

/// Run all pending schema migrations.
pub async fn run(config: &CrmConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.database_url).await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
