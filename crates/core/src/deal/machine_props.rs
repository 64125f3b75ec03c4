//! Property-based tests for the deal stage machine.

use proptest::prelude::*;

use crate::deal::machine::fixtures::{deal_in, today};
use crate::deal::machine::{DEAL_TRANSITIONS, DealStageMachine};
use crate::deal::types::{Deal, DealStage, LossReasonCategory, ProbabilityTable};

fn arb_stage() -> impl Strategy<Value = DealStage> {
    prop_oneof![
        Just(DealStage::Lead),
        Just(DealStage::Qualified),
        Just(DealStage::Proposal),
        Just(DealStage::Negotiation),
        Just(DealStage::Won),
        Just(DealStage::Lost),
    ]
}

fn arb_category() -> impl Strategy<Value = LossReasonCategory> {
    prop_oneof![
        Just(LossReasonCategory::Price),
        Just(LossReasonCategory::Timing),
        Just(LossReasonCategory::Competitor),
        Just(LossReasonCategory::Requirements),
        Just(LossReasonCategory::Other),
    ]
}

/// One lifecycle operation against a deal.
#[derive(Debug, Clone)]
enum Op {
    Advance(DealStage),
    Win,
    Lose(LossReasonCategory),
    Reopen,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_stage().prop_map(Op::Advance),
        Just(Op::Win),
        arb_category().prop_map(Op::Lose),
        Just(Op::Reopen),
    ]
}

fn apply(deal: &Deal, op: &Op) -> Option<Deal> {
    let table = ProbabilityTable::default();
    let result = match op {
        Op::Advance(target) => DealStageMachine::advance(deal, *target, None, &table, today())
            .map(|change| change.map_or_else(|| deal.clone(), |c| c.deal)),
        Op::Win => DealStageMachine::win(deal, None, &table, today()).map(|c| c.deal),
        Op::Lose(category) => {
            DealStageMachine::lose(deal, *category, "lost", &table, today()).map(|c| c.deal)
        }
        Op::Reopen => DealStageMachine::reopen(deal, &table).map(|c| c.deal),
    };
    result.ok()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Identity is always a no-op.
    #[test]
    fn prop_identity_transition_is_noop(stage in arb_stage()) {
        let deal = deal_in(stage);
        let result = DealStageMachine::advance(&deal, stage, None, &ProbabilityTable::default(), today());
        prop_assert_eq!(result, Ok(None));
    }

    /// Pairs outside the table are rejected; pairs inside succeed.
    #[test]
    fn prop_advance_matches_table(from in arb_stage(), to in arb_stage()) {
        prop_assume!(from != to);
        let listed = DEAL_TRANSITIONS
            .iter()
            .any(|(stage, targets)| *stage == from && targets.contains(&to));
        let deal = deal_in(from);
        let result = DealStageMachine::advance(&deal, to, None, &ProbabilityTable::default(), today());
        if listed {
            prop_assert!(matches!(result, Ok(Some(_))));
        } else {
            let err = result.unwrap_err();
            prop_assert_eq!(err.error_code(), "INVALID_TRANSITION");
        }
    }

    /// Probability is always the table value for the current stage.
    #[test]
    fn prop_probability_follows_stage(ops in prop::collection::vec(arb_op(), 1..20)) {
        let table = ProbabilityTable::default();
        let mut deal = deal_in(DealStage::Lead);
        for op in &ops {
            if let Some(next) = apply(&deal, op) {
                deal = next;
            }
            prop_assert_eq!(deal.probability, table.for_stage(deal.stage));
        }
    }

    /// Close date is set exactly when closed; loss fields only while lost.
    #[test]
    fn prop_close_fields_track_stage(ops in prop::collection::vec(arb_op(), 1..20)) {
        let mut deal = deal_in(DealStage::Lead);
        for op in &ops {
            if let Some(next) = apply(&deal, op) {
                deal = next;
            }
            prop_assert_eq!(deal.actual_close_date.is_some(), deal.stage.is_closed());
            if deal.stage != DealStage::Lost {
                prop_assert_eq!(deal.loss_reason_category, None);
                prop_assert!(deal.lost_reason.is_empty());
            }
        }
    }

    /// Once won, no operation changes the stage.
    #[test]
    fn prop_won_is_terminal(ops in prop::collection::vec(arb_op(), 1..10)) {
        let won = deal_in(DealStage::Won);
        for op in &ops {
            if let Some(next) = apply(&won, op) {
                prop_assert_eq!(next.stage, DealStage::Won);
            }
        }
    }
}
