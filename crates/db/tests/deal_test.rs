//! Deal pipeline scenarios against a migrated database.

mod common;

use chrono::NaiveDate;
use kontrakt_core::activity::ActivityTarget;
use kontrakt_core::deal::{DealChanges, DealStage, LossReasonCategory};
use kontrakt_core::error::LifecycleError;
use kontrakt_core::project::ProjectPhase;
use kontrakt_db::{ActivityRepository, DealRepository, OfferRepository};
use kontrakt_shared::types::{CustomerId, DealId};
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{colleague, customer, manager, new_deal, new_offer, owner, setup};

#[tokio::test]
async fn test_create_deal_starts_in_lead_with_creation_history() {
    let test = setup().await;
    let repo = DealRepository::new(test.ctx.clone());
    let customer_id = customer(&test.ctx).await;

    let deal = repo.create_deal(new_deal(customer_id), &owner()).await.unwrap();

    assert_eq!(deal.stage, DealStage::Lead);
    assert_eq!(deal.probability, 10);
    assert_eq!(deal.owner_id, "user-anna");
    assert_eq!(deal.version, 1);
    assert!(deal.actual_close_date.is_none());

    let history = repo.stage_history(deal.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from_stage, None);
    assert_eq!(history[0].to_stage, DealStage::Lead);
    assert_eq!(history[0].deal_version, 1);
}

#[tokio::test]
async fn test_create_deal_requires_existing_customer() {
    let test = setup().await;
    let repo = DealRepository::new(test.ctx.clone());

    let result = repo
        .create_deal(new_deal(CustomerId(Uuid::now_v7())), &owner())
        .await;

    assert!(matches!(
        result,
        Err(LifecycleError::NotFound { entity: "customer", .. })
    ));
}

#[tokio::test]
async fn test_pipeline_to_won_records_history_most_recent_first() {
    let test = setup().await;
    let repo = DealRepository::new(test.ctx.clone());
    let customer_id = customer(&test.ctx).await;
    let deal = repo.create_deal(new_deal(customer_id), &owner()).await.unwrap();

    for stage in [DealStage::Qualified, DealStage::Proposal, DealStage::Negotiation] {
        let transition = repo.advance_stage(deal.id, stage, &owner(), None).await.unwrap();
        assert_eq!(transition.deal.stage, stage);
        assert!(transition.deal.actual_close_date.is_none());
    }

    let won = repo
        .win_deal(deal.id, true, &owner(), Some("Signed".to_string()))
        .await
        .unwrap();

    assert_eq!(won.deal.stage, DealStage::Won);
    assert_eq!(won.deal.probability, 100);
    assert_eq!(
        won.deal.actual_close_date,
        NaiveDate::from_ymd_opt(2026, 3, 2)
    );

    let project = won.project.unwrap();
    assert_eq!(project.phase, ProjectPhase::Tilbud);
    assert_eq!(project.deal_id, Some(deal.id));
    assert_eq!(project.project_number.as_deref(), Some("ST-2026-001"));

    let history = repo.stage_history(deal.id).await.unwrap();
    let stages: Vec<DealStage> = history.iter().map(|row| row.to_stage).collect();
    assert_eq!(
        stages,
        [
            DealStage::Won,
            DealStage::Negotiation,
            DealStage::Proposal,
            DealStage::Qualified,
            DealStage::Lead,
        ]
    );
    assert_eq!(history[0].notes.as_deref(), Some("Signed"));
    assert_eq!(history[0].deal_version, 5);
}

#[tokio::test]
async fn test_identity_advance_writes_no_history() {
    let test = setup().await;
    let repo = DealRepository::new(test.ctx.clone());
    let customer_id = customer(&test.ctx).await;
    let deal = repo.create_deal(new_deal(customer_id), &owner()).await.unwrap();

    let transition = repo
        .advance_stage(deal.id, DealStage::Lead, &owner(), None)
        .await
        .unwrap();

    assert!(transition.history.is_none());
    assert_eq!(transition.deal.version, deal.version);
    assert_eq!(repo.stage_history(deal.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_lost_deal_cannot_be_won_until_reopened() {
    let test = setup().await;
    let repo = DealRepository::new(test.ctx.clone());
    let customer_id = customer(&test.ctx).await;
    let deal = repo.create_deal(new_deal(customer_id), &owner()).await.unwrap();

    let lost = repo
        .lose_deal(deal.id, LossReasonCategory::Price, "Too expensive", &owner())
        .await
        .unwrap();
    assert_eq!(lost.deal.stage, DealStage::Lost);
    assert_eq!(lost.deal.probability, 0);
    assert_eq!(lost.deal.lost_reason, "Too expensive");
    assert_eq!(lost.deal.loss_reason_category, Some(LossReasonCategory::Price));
    assert!(
        lost.history
            .unwrap()
            .notes
            .unwrap()
            .contains("Too expensive")
    );

    let win = repo.win_deal(deal.id, false, &owner(), None).await;
    assert!(matches!(win, Err(LifecycleError::InvalidTransition(_))));

    let reopened = repo.reopen_deal(deal.id, &owner()).await.unwrap();
    assert_eq!(reopened.deal.stage, DealStage::Lead);
    assert_eq!(reopened.deal.probability, 10);
    assert!(reopened.deal.actual_close_date.is_none());
    assert!(reopened.deal.loss_reason_category.is_none());

    repo.advance_stage(deal.id, DealStage::Negotiation, &owner(), None)
        .await
        .unwrap();
    let won = repo.win_deal(deal.id, false, &owner(), None).await.unwrap();
    assert_eq!(won.deal.stage, DealStage::Won);
    assert!(won.project.is_none());
}

#[tokio::test]
async fn test_win_requires_negotiation() {
    let test = setup().await;
    let repo = DealRepository::new(test.ctx.clone());
    let customer_id = customer(&test.ctx).await;
    let deal = repo.create_deal(new_deal(customer_id), &owner()).await.unwrap();

    let result = repo.win_deal(deal.id, true, &owner(), None).await;

    assert!(matches!(result, Err(LifecycleError::InvalidTransition(_))));
    assert_eq!(repo.find(deal.id).await.unwrap().stage, DealStage::Lead);
}

#[tokio::test]
async fn test_reopen_requires_lost_deal() {
    let test = setup().await;
    let repo = DealRepository::new(test.ctx.clone());
    let customer_id = customer(&test.ctx).await;
    let deal = repo.create_deal(new_deal(customer_id), &owner()).await.unwrap();

    let result = repo.reopen_deal(deal.id, &owner()).await;

    assert!(matches!(result, Err(LifecycleError::InvalidState(_))));
}

#[tokio::test]
async fn test_lose_without_notes_records_category_only() {
    let test = setup().await;
    let repo = DealRepository::new(test.ctx.clone());
    let customer_id = customer(&test.ctx).await;
    let deal = repo.create_deal(new_deal(customer_id), &owner()).await.unwrap();

    let lost = repo
        .lose_deal(deal.id, LossReasonCategory::Timing, "   ", &owner())
        .await
        .unwrap();

    assert_eq!(lost.deal.lost_reason, "");
    assert_eq!(lost.history.unwrap().notes.as_deref(), Some("[timing]"));
}

#[tokio::test]
async fn test_win_links_existing_offer_to_new_project() {
    let test = setup().await;
    let deals = DealRepository::new(test.ctx.clone());
    let offers = OfferRepository::new(test.ctx.clone());
    let customer_id = customer(&test.ctx).await;

    let deal = deals.create_deal(new_deal(customer_id), &owner()).await.unwrap();
    let offer = offers.create_offer(new_offer(customer_id), &owner()).await.unwrap();
    let linked_deal = deals.link_offer(deal.id, offer.id, &owner()).await.unwrap();
    assert_eq!(linked_deal.offer_id, Some(offer.id));

    deals
        .advance_stage(deal.id, DealStage::Negotiation, &owner(), None)
        .await
        .unwrap();
    let won = deals.win_deal(deal.id, true, &owner(), None).await.unwrap();
    let project = won.project.unwrap();

    let linked = offers.find(offer.id).await.unwrap();
    assert_eq!(linked.project_id, Some(project.id));
}

#[tokio::test]
async fn test_link_offer_rejects_a_second_offer() {
    let test = setup().await;
    let deals = DealRepository::new(test.ctx.clone());
    let offers = OfferRepository::new(test.ctx.clone());
    let customer_id = customer(&test.ctx).await;

    let deal = deals.create_deal(new_deal(customer_id), &owner()).await.unwrap();
    let first = offers.create_offer(new_offer(customer_id), &owner()).await.unwrap();
    let second = offers.create_offer(new_offer(customer_id), &owner()).await.unwrap();

    deals.link_offer(deal.id, first.id, &owner()).await.unwrap();
    let same = deals.link_offer(deal.id, first.id, &owner()).await.unwrap();
    let other = deals.link_offer(deal.id, second.id, &owner()).await;

    assert_eq!(same.offer_id, Some(first.id));
    assert!(matches!(other, Err(LifecycleError::InvalidState(_))));
}

#[tokio::test]
async fn test_non_owner_is_forbidden_but_manager_is_not() {
    let test = setup().await;
    let repo = DealRepository::new(test.ctx.clone());
    let customer_id = customer(&test.ctx).await;
    let deal = repo.create_deal(new_deal(customer_id), &owner()).await.unwrap();

    let denied = repo
        .advance_stage(deal.id, DealStage::Qualified, &colleague(), None)
        .await;
    assert!(matches!(denied, Err(LifecycleError::Forbidden(_))));

    let allowed = repo
        .update_deal_details(
            deal.id,
            DealChanges {
                value: Some(dec!(1_500_000)),
                ..DealChanges::default()
            },
            &manager(),
        )
        .await
        .unwrap();
    assert_eq!(allowed.value, dec!(1_500_000));
    assert_eq!(allowed.stage, DealStage::Lead);
}

#[tokio::test]
async fn test_deal_activities_are_recorded() {
    let test = setup().await;
    let repo = DealRepository::new(test.ctx.clone());
    let activities = ActivityRepository::new(test.ctx.clone());
    let customer_id = customer(&test.ctx).await;
    let deal = repo.create_deal(new_deal(customer_id), &owner()).await.unwrap();

    let rows = activities.list_for(ActivityTarget::Deal(deal.id)).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Deal created");
    assert_eq!(rows[0].actor_id, "user-anna");
}

#[tokio::test]
async fn test_unknown_deal_is_not_found() {
    let test = setup().await;
    let repo = DealRepository::new(test.ctx.clone());

    let result = repo.find(DealId(Uuid::now_v7())).await;

    assert!(matches!(
        result,
        Err(LifecycleError::NotFound { entity: "deal", .. })
    ));
}
