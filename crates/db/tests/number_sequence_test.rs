//! Number sequence allocation under contention.

mod common;

use futures::future::join_all;
use kontrakt_core::error::LifecycleError;
use kontrakt_core::numbering::CompanyId;
use kontrakt_core::offer::{NewOffer, OfferPhase};
use kontrakt_db::{NumberSequenceRepository, OfferRepository};

use common::{customer, new_offer, owner, setup, stalbygg};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_200_concurrent_allocations_are_contiguous() {
    let test = setup().await;
    let repo = NumberSequenceRepository::new(test.ctx.clone());
    let company = stalbygg();

    let tasks = (0..200).map(|_| {
        let repo = repo.clone();
        let company = company.clone();
        tokio::spawn(async move { repo.allocate(&company, 2026).await })
    });

    let mut values: Vec<i64> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    values.sort_unstable();

    assert_eq!(values, (1..=200).collect::<Vec<_>>());
    assert_eq!(repo.current(&company, 2026).await.unwrap(), 200);
}

#[tokio::test]
async fn test_sequences_are_independent_per_company_and_year() {
    let test = setup().await;
    let repo = NumberSequenceRepository::new(test.ctx.clone());
    let hybrid = CompanyId::new("hybridbygg");

    assert_eq!(repo.allocate(&stalbygg(), 2026).await.unwrap(), 1);
    assert_eq!(repo.allocate(&stalbygg(), 2026).await.unwrap(), 2);
    assert_eq!(repo.allocate(&hybrid, 2026).await.unwrap(), 1);
    assert_eq!(repo.allocate(&stalbygg(), 2027).await.unwrap(), 1);
}

#[tokio::test]
async fn test_next_number_formats_with_company_prefix() {
    let test = setup().await;
    let repo = NumberSequenceRepository::new(test.ctx.clone());

    let first = repo.next_number(&stalbygg(), 2026).await.unwrap();
    let other = repo
        .next_number(&CompanyId::new("unknown-co"), 2026)
        .await
        .unwrap();

    assert_eq!(first.to_string(), "ST-2026-001");
    assert_eq!(other.to_string(), "GR-2026-001");
}

#[tokio::test]
async fn test_current_is_zero_before_first_allocation() {
    let test = setup().await;
    let repo = NumberSequenceRepository::new(test.ctx.clone());

    assert_eq!(repo.current(&stalbygg(), 2026).await.unwrap(), 0);
}

#[tokio::test]
async fn test_initialize_raises_but_never_lowers() {
    let test = setup().await;
    let repo = NumberSequenceRepository::new(test.ctx.clone());
    let company = stalbygg();

    assert_eq!(repo.initialize(&company, 2026, 41).await.unwrap(), 41);
    assert_eq!(repo.allocate(&company, 2026).await.unwrap(), 42);

    assert_eq!(repo.initialize(&company, 2026, 10).await.unwrap(), 42);
    assert_eq!(repo.current(&company, 2026).await.unwrap(), 42);
}

#[tokio::test]
async fn test_initialize_rejects_negative_start() {
    let test = setup().await;
    let repo = NumberSequenceRepository::new(test.ctx.clone());

    let result = repo.initialize(&stalbygg(), 2026, -1).await;

    assert!(matches!(result, Err(LifecycleError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_companies_sharing_a_prefix_share_a_counter() {
    let test = setup().await;
    let repo = NumberSequenceRepository::new(test.ctx.clone());
    let gruppen = CompanyId::new("gruppen");
    let acme = CompanyId::new("acme");

    let first = repo.next_number(&gruppen, 2026).await.unwrap();
    let second = repo.next_number(&acme, 2026).await.unwrap();
    let third = repo.next_number(&gruppen, 2026).await.unwrap();

    assert_eq!(first.to_string(), "GR-2026-001");
    assert_eq!(second.to_string(), "GR-2026-002");
    assert_eq!(third.to_string(), "GR-2026-003");
    assert_eq!(repo.current(&acme, 2026).await.unwrap(), 3);
    assert_eq!(repo.current(&stalbygg(), 2026).await.unwrap(), 0);
}

#[tokio::test]
async fn test_offers_for_default_prefix_companies_get_distinct_numbers() {
    let test = setup().await;
    let repo = OfferRepository::new(test.ctx.clone());
    let customer_id = customer(&test.ctx).await;

    let mut numbers = Vec::new();
    for company in ["gruppen", "acme"] {
        let offer = repo
            .create_offer(
                NewOffer {
                    company_id: Some(CompanyId::new(company)),
                    ..new_offer(customer_id)
                },
                &owner(),
            )
            .await
            .unwrap();
        let prepared = repo
            .advance_phase(offer.id, OfferPhase::InProgress, &owner())
            .await
            .unwrap();
        numbers.push(prepared.offer.offer_number.unwrap());
    }

    assert_eq!(numbers, ["GR-2026-001", "GR-2026-002"]);
}
