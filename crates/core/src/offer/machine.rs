//! Offer phase state machine.
//!
//! Validates moves against [`OFFER_TRANSITIONS`] and applies the entry
//! actions of the target phase. Number allocation needs the store, so the
//! caller asks [`OfferPhaseMachine::needs_number`] first and assigns the
//! number before calling [`OfferPhaseMachine::advance`].

use chrono::{Days, NaiveDate};

use crate::error::LifecycleError;
use crate::offer::types::{Offer, OfferPhase, OrderExecution};

/// Allowed non-identity moves per phase.
pub const OFFER_TRANSITIONS: [(OfferPhase, &[OfferPhase]); 7] = [
    (OfferPhase::Draft, &[OfferPhase::InProgress, OfferPhase::Lost]),
    (
        OfferPhase::InProgress,
        &[OfferPhase::Sent, OfferPhase::Draft, OfferPhase::Lost],
    ),
    (
        OfferPhase::Sent,
        &[
            OfferPhase::Order,
            OfferPhase::Lost,
            OfferPhase::Expired,
            OfferPhase::InProgress,
        ],
    ),
    (OfferPhase::Order, &[OfferPhase::Completed, OfferPhase::Lost]),
    (OfferPhase::Completed, &[OfferPhase::Order]),
    (OfferPhase::Lost, &[OfferPhase::Draft]),
    (OfferPhase::Expired, &[OfferPhase::Draft]),
];

/// Inputs for entry actions.
#[derive(Debug, Clone, Copy)]
pub struct PhaseContext {
    /// Today's date from the injected clock.
    pub today: NaiveDate,
    /// Days from sent date to expiration date.
    pub validity_days: u64,
}

/// A validated phase change, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseChange {
    /// The offer after the change.
    pub offer: Offer,
    /// Phase before the change.
    pub from: OfferPhase,
    /// Phase after the change.
    pub to: OfferPhase,
}

/// Stateless offer phase machine.
pub struct OfferPhaseMachine;

impl OfferPhaseMachine {
    /// Initial phase of every new offer.
    pub const INITIAL_PHASE: OfferPhase = OfferPhase::Draft;

    /// Returns true if `from → to` is allowed. Identity is always allowed.
    #[must_use]
    pub fn can_transition(from: OfferPhase, to: OfferPhase) -> bool {
        from == to
            || OFFER_TRANSITIONS
                .iter()
                .find(|(phase, _)| *phase == from)
                .is_some_and(|(_, targets)| targets.contains(&to))
    }

    /// Returns true if moving to `target` requires a number the offer lacks.
    #[must_use]
    pub fn needs_number(offer: &Offer, target: OfferPhase) -> bool {
        offer.phase == OfferPhase::Draft
            && target == OfferPhase::InProgress
            && offer.offer_number.is_none()
    }

    /// Moves the offer to `target` and applies entry actions.
    ///
    /// Returns `Ok(None)` for the identity transition, leaving every field as is.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` when the move is not in [`OFFER_TRANSITIONS`]
    /// - `InvalidState` when leaving draft without company, responsible or number
    pub fn advance(
        offer: &Offer,
        target: OfferPhase,
        ctx: PhaseContext,
    ) -> Result<Option<PhaseChange>, LifecycleError> {
        if offer.phase == target {
            return Ok(None);
        }
        if !Self::can_transition(offer.phase, target) {
            return Err(LifecycleError::transition("offer", offer.phase, target));
        }
        if offer.phase == OfferPhase::Draft && target == OfferPhase::InProgress {
            Self::check_ready_to_leave_draft(offer)?;
        }

        let mut next = offer.clone();
        next.phase = target;

        match (offer.phase, target) {
            (OfferPhase::Sent, OfferPhase::InProgress) => {
                next.sent_date = None;
                next.expiration_date = None;
            }
            (_, OfferPhase::Sent) => {
                let sent = *next.sent_date.get_or_insert(ctx.today);
                if next.expiration_date.is_none() {
                    next.expiration_date = sent.checked_add_days(Days::new(ctx.validity_days));
                }
            }
            (_, OfferPhase::Order) => {
                if next.execution.is_none() {
                    next.execution = Some(OrderExecution::started(ctx.today));
                }
            }
            (_, OfferPhase::Completed) => {
                let execution = next
                    .execution
                    .get_or_insert_with(|| OrderExecution::started(ctx.today));
                execution.completion_percent = 100;
                if execution.end_date.is_none() {
                    execution.end_date = Some(ctx.today);
                }
            }
            _ => {}
        }

        next.recompute_derived();

        Ok(Some(PhaseChange {
            offer: next,
            from: offer.phase,
            to: target,
        }))
    }

    /// Moves the offer to `order` from any phase that can reach it.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when `order` is unreachable from the current phase.
    pub fn accept(offer: &Offer, ctx: PhaseContext) -> Result<Option<PhaseChange>, LifecycleError> {
        if !Self::can_transition(offer.phase, OfferPhase::Order) {
            return Err(LifecycleError::InvalidTransition(format!(
                "offer in phase {} cannot be accepted as an order",
                offer.phase
            )));
        }
        Self::advance(offer, OfferPhase::Order, ctx)
    }

    fn check_ready_to_leave_draft(offer: &Offer) -> Result<(), LifecycleError> {
        if offer.company_id.is_none() {
            return Err(LifecycleError::InvalidState(
                "offer needs a company before leaving draft".to_string(),
            ));
        }
        if offer.responsible_user_id.is_none() {
            return Err(LifecycleError::InvalidState(
                "offer needs a responsible user before leaving draft".to_string(),
            ));
        }
        if offer.offer_number.is_none() {
            return Err(LifecycleError::InvalidState(
                "offer number must be allocated before leaving draft".to_string(),
            ));
        }
        Ok(())
    }
}
