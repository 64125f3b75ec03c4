//! Property-based tests for the offer phase machine.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::margin::MarginCalculator;
use crate::offer::machine::fixtures::{ctx, draft_offer};
use crate::offer::machine::{OFFER_TRANSITIONS, OfferPhaseMachine};
use crate::offer::types::{Offer, OfferPhase};

fn arb_phase() -> impl Strategy<Value = OfferPhase> {
    prop::sample::select(OfferPhase::ALL.to_vec())
}

/// Applies a move the way a repository would, allocating a number first.
fn step(offer: &Offer, target: OfferPhase) -> Offer {
    let mut current = offer.clone();
    if OfferPhaseMachine::needs_number(&current, target) {
        current.offer_number = Some("GR-2026-001".to_string());
    }
    match OfferPhaseMachine::advance(&current, target, ctx()) {
        Ok(Some(change)) => change.offer,
        Ok(None) | Err(_) => offer.clone(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Moves outside the table are rejected.
    #[test]
    fn prop_table_is_enforced(from in arb_phase(), to in arb_phase()) {
        prop_assume!(from != to);
        let listed = OFFER_TRANSITIONS
            .iter()
            .any(|(phase, targets)| *phase == from && targets.contains(&to));
        prop_assert_eq!(OfferPhaseMachine::can_transition(from, to), listed);

        let mut offer = draft_offer();
        offer.phase = from;
        offer.offer_number = Some("GR-2026-001".to_string());
        let result = OfferPhaseMachine::advance(&offer, to, ctx());
        prop_assert_eq!(result.is_ok(), listed);
    }

    /// Derived fields always match their inputs after any walk.
    #[test]
    fn prop_derived_fields_consistent(
        path in prop::collection::vec(arb_phase(), 1..25),
        value in 0i64..10_000_000,
        cost in 0i64..10_000_000,
    ) {
        let mut offer = draft_offer();
        offer.value = Decimal::from(value);
        offer.cost = Decimal::from(cost);
        offer.recompute_derived();
        for target in path {
            offer = step(&offer, target);
            prop_assert_eq!(
                offer.margin_percent,
                MarginCalculator::margin_percent(offer.value, offer.cost)
            );
            let expected_reserve = offer
                .execution
                .as_ref()
                .map(|execution| offer.value - execution.invoiced);
            prop_assert_eq!(offer.order_reserve, expected_reserve);
        }
    }

    /// Once allocated, a number never changes or disappears.
    #[test]
    fn prop_number_is_permanent(path in prop::collection::vec(arb_phase(), 1..25)) {
        let mut offer = draft_offer();
        let mut seen: Option<String> = None;
        for target in path {
            offer = step(&offer, target);
            if let Some(number) = &seen {
                prop_assert_eq!(offer.offer_number.as_ref(), Some(number));
            }
            seen.clone_from(&offer.offer_number);
            if offer.phase != OfferPhase::Draft && offer.phase != OfferPhase::Lost {
                prop_assert!(offer.offer_number.is_some());
            }
        }
    }

    /// Execution tracking survives every move once created.
    #[test]
    fn prop_execution_never_reset(path in prop::collection::vec(arb_phase(), 1..25)) {
        let mut offer = draft_offer();
        for target in path {
            let had_execution = offer.execution.clone();
            offer = step(&offer, target);
            if let (Some(before), Some(after)) = (&had_execution, &offer.execution) {
                prop_assert_eq!(before.spent, after.spent);
                prop_assert_eq!(before.invoiced, after.invoiced);
                prop_assert_eq!(before.start_date, after.start_date);
            }
            if had_execution.is_some() {
                prop_assert!(offer.execution.is_some());
            }
        }
    }
}
