//! Shared fixtures for the database integration tests.
//!
//! Every test gets its own SQLite file, migrated with the real migrator, a
//! frozen clock and deterministic ids.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use kontrakt_core::access::{Actor, Role};
use kontrakt_core::deal::NewDeal;
use kontrakt_core::numbering::CompanyId;
use kontrakt_core::offer::NewOffer;
use kontrakt_db::migration::Migrator;
use kontrakt_db::{CustomerRepository, LifecycleContext};
use kontrakt_db::repositories::CreateCustomerInput;
use kontrakt_shared::config::NumberingConfig;
use kontrakt_shared::types::CustomerId;
use kontrakt_shared::{FixedClock, SequentialIdGenerator};
use rust_decimal_macros::dec;
use sea_orm_migration::MigratorTrait;
use tempfile::TempDir;

/// A migrated database and the context bound to it.
pub struct TestDb {
    _dir: TempDir,
    pub ctx: LifecycleContext,
    pub clock: Arc<FixedClock>,
}

/// Creates a fresh database frozen at 2026-03-02 09:00 UTC.
pub async fn setup() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("kontrakt.db").display()
    );
    let db = kontrakt_db::connect(&url).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
    ));
    let ctx = LifecycleContext::new(db)
        .with_clock(clock.clone())
        .with_ids(Arc::new(SequentialIdGenerator::default()))
        .with_numbering(NumberingConfig {
            max_retries: 50,
            retry_backoff_ms: 5,
        });

    TestDb {
        _dir: dir,
        ctx,
        clock,
    }
}

/// Salesperson owning the fixtures.
pub fn owner() -> Actor {
    Actor::new("user-anna", "Anna Berg").with_role(Role::Sales)
}

/// Salesperson who owns nothing.
pub fn colleague() -> Actor {
    Actor::new("user-ola", "Ola Dahl").with_role(Role::Sales)
}

/// Manager allowed to change anybody's entities.
pub fn manager() -> Actor {
    Actor::new("user-kari", "Kari Lie").with_role(Role::Manager)
}

pub fn stalbygg() -> CompanyId {
    CompanyId::new("stalbygg")
}

pub async fn customer(ctx: &LifecycleContext) -> CustomerId {
    let model = CustomerRepository::new(ctx.clone())
        .create(
            CreateCustomerInput {
                name: "Fjordbygg AS".to_string(),
                org_number: Some("987654321".to_string()),
            },
            &owner(),
        )
        .await
        .unwrap();
    CustomerId(model.id)
}

pub fn new_deal(customer_id: CustomerId) -> NewDeal {
    NewDeal {
        title: "Warehouse extension".to_string(),
        customer_id,
        company_id: stalbygg(),
        owner_id: None,
        value: dec!(1_200_000),
        currency: None,
        expected_close_date: None,
        notes: None,
    }
}

pub fn new_offer(customer_id: CustomerId) -> NewOffer {
    NewOffer {
        title: "Steel frame, hall B".to_string(),
        customer_id: Some(customer_id),
        company_id: Some(stalbygg()),
        responsible_user_id: Some(owner().user_id),
        value: dec!(500_000),
        cost: dec!(400_000),
        ..NewOffer::default()
    }
}
