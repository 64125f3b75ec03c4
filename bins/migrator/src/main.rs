//! Database migration runner for Kontrakt.
//!
//! Usage:
//!   migrator up      - Run all pending migrations
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!   migrator reset   - Rollback every migration

use anyhow::{Context, bail};
use kontrakt_db::connect_with;
use kontrakt_db::migration::Migrator;
use kontrakt_shared::AppConfig;
use kontrakt_shared::config::LoggingConfig;
use sea_orm_migration::MigratorTrait;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());

    tracing_subscriber::registry()
        .with(filter)
        .with(logging.json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!logging.json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());

    let db = connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!(command = %command, "Connected to database");

    match command.as_str() {
        "up" => Migrator::up(&db, None).await?,
        "down" => Migrator::down(&db, Some(1)).await?,
        "status" => Migrator::status(&db).await?,
        "fresh" => Migrator::fresh(&db).await?,
        "reset" => Migrator::reset(&db).await?,
        other => bail!("Unknown command `{other}`; expected up, down, status, fresh or reset"),
    }

    info!(command = %command, "Migration command finished");
    Ok(())
}
