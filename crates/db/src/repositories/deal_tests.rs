//! Optimistic locking of deal writes.

use kontrakt_core::access::Role;
use kontrakt_shared::types::CustomerId;
use rust_decimal_macros::dec;
use sea_orm_migration::MigratorTrait;

use super::*;
use crate::migration::Migrator;
use crate::repositories::customer::{CreateCustomerInput, CustomerRepository};

async fn context() -> (tempfile::TempDir, LifecycleContext) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("deals.db").display());
    let db = crate::connect(&url).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    (dir, LifecycleContext::new(db))
}

fn actor() -> Actor {
    Actor::new("user-anna", "Anna Berg").with_role(Role::Sales)
}

async fn seeded_deal(ctx: &LifecycleContext) -> Deal {
    let customer = CustomerRepository::new(ctx.clone())
        .create(
            CreateCustomerInput {
                name: "Fjordbygg AS".to_string(),
                org_number: None,
            },
            &actor(),
        )
        .await
        .unwrap();

    DealRepository::new(ctx.clone())
        .create_deal(
            NewDeal {
                title: "Warehouse".to_string(),
                customer_id: CustomerId(customer.id),
                company_id: kontrakt_core::numbering::CompanyId::new("stalbygg"),
                owner_id: None,
                value: dec!(1000),
                currency: None,
                expected_close_date: None,
                notes: None,
            },
            &actor(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_save_with_stale_version_is_a_conflict() {
    let (_dir, ctx) = context().await;
    let deal = seeded_deal(&ctx).await;
    let now = ctx.clock.now();

    let mut first = deal.clone();
    first.title = "Warehouse, phase 1".to_string();
    let saved = save_deal(&ctx.db, first, deal.version, now).await.unwrap();
    assert_eq!(saved.version, deal.version + 1);

    let mut stale = deal.clone();
    stale.title = "Warehouse, phase 2".to_string();
    let result = save_deal(&ctx.db, stale, deal.version, now).await;

    assert!(matches!(
        result,
        Err(LifecycleError::ConcurrentModification { entity: "deal", .. })
    ));
    let stored = load_deal(&ctx.db, deal.id).await.unwrap();
    assert_eq!(stored.title, "Warehouse, phase 1");
    assert!(result.unwrap_err().is_retryable());
}

#[tokio::test]
async fn test_stage_change_bumps_version_once() {
    let (_dir, ctx) = context().await;
    let deal = seeded_deal(&ctx).await;

    let txn = ctx.db.begin().await.unwrap();
    let change = DealStageMachine::advance(
        &deal,
        DealStage::Qualified,
        None,
        &ctx.settings.probabilities,
        ctx.clock.today(),
    )
    .unwrap()
    .unwrap();
    let (saved, history) = record_stage_change(&txn, &ctx, change, &actor()).await.unwrap();
    txn.commit().await.unwrap();

    assert_eq!(saved.version, deal.version + 1);
    assert_eq!(history.deal_version, saved.version);
    assert_eq!(history.from_stage, Some(DealStage::Lead));
}

#[tokio::test]
async fn test_racing_stage_changes_leave_one_history_row() {
    let (_dir, ctx) = context().await;
    let deal = seeded_deal(&ctx).await;
    let repo = DealRepository::new(ctx.clone());

    // Both callers read the deal before either writes.
    let first_read = load_deal(&ctx.db, deal.id).await.unwrap();
    let second_read = load_deal(&ctx.db, deal.id).await.unwrap();
    assert_eq!(first_read.version, second_read.version);

    let txn = ctx.db.begin().await.unwrap();
    let winner = advance_deal_in(&txn, &ctx, first_read, DealStage::Qualified, None, &actor())
        .await
        .unwrap();
    txn.commit().await.unwrap();
    assert_eq!(winner.deal.version, deal.version + 1);

    let txn = ctx.db.begin().await.unwrap();
    let loser = advance_deal_in(&txn, &ctx, second_read, DealStage::Qualified, None, &actor()).await;
    txn.rollback().await.unwrap();

    let err = loser.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::ConcurrentModification { entity: "deal", .. }
    ));
    assert!(err.is_retryable());

    let history = repo.stage_history(deal.id).await.unwrap();
    let changes: Vec<_> = history
        .iter()
        .filter(|row| row.to_stage == DealStage::Qualified)
        .collect();
    assert_eq!(changes.len(), 1);
    assert_eq!(history.len(), 2);

    let stored = repo.find(deal.id).await.unwrap();
    assert_eq!(stored.version, deal.version + 1);
    assert_eq!(stored.stage, DealStage::Qualified);
}

#[tokio::test]
async fn test_retry_after_conflict_sees_the_winner() {
    let (_dir, ctx) = context().await;
    let deal = seeded_deal(&ctx).await;
    let repo = DealRepository::new(ctx.clone());
    let stale = load_deal(&ctx.db, deal.id).await.unwrap();

    repo.advance_stage(deal.id, DealStage::Qualified, &actor(), None)
        .await
        .unwrap();
    let conflict = advance_deal_in(&ctx.db, &ctx, stale, DealStage::Qualified, None, &actor()).await;
    assert!(matches!(
        conflict,
        Err(LifecycleError::ConcurrentModification { .. })
    ));

    let retried = repo
        .advance_stage(deal.id, DealStage::Qualified, &actor(), None)
        .await
        .unwrap();
    assert!(retried.history.is_none());
    assert_eq!(repo.stage_history(deal.id).await.unwrap().len(), 2);
}
