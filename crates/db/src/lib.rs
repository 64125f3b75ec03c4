//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repositories that persist every lifecycle operation in one transaction
//! - The number sequence allocator
//! - The lifecycle orchestrator for cross-entity flows
//! - Database migrations

pub mod context;
pub mod entities;
pub mod mapping;
pub mod migration;
pub mod repositories;

pub use context::LifecycleContext;
pub use repositories::{
    ActivityRepository, BudgetItemRepository, CustomerRepository, DealRepository,
    LifecycleService, NumberSequenceRepository, OfferRepository, ProjectRepository,
};

use kontrakt_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection using the `database` configuration section.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
