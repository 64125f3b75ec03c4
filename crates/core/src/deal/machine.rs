//! Deal stage state machine.
//!
//! Pure transition logic. Callers persist the returned [`StageChange`] and its
//! history row in one transaction.

use chrono::NaiveDate;

use crate::deal::types::{Deal, DealStage, LossReasonCategory, ProbabilityTable};
use crate::error::LifecycleError;

/// Allowed non-identity moves per stage.
///
/// Open stages may move anywhere, including straight to won or lost.
/// Won and lost have no generic exits; lost leaves through [`DealStageMachine::reopen`].
pub const DEAL_TRANSITIONS: [(DealStage, &[DealStage]); 6] = [
    (
        DealStage::Lead,
        &[
            DealStage::Qualified,
            DealStage::Proposal,
            DealStage::Negotiation,
            DealStage::Won,
            DealStage::Lost,
        ],
    ),
    (
        DealStage::Qualified,
        &[
            DealStage::Lead,
            DealStage::Proposal,
            DealStage::Negotiation,
            DealStage::Won,
            DealStage::Lost,
        ],
    ),
    (
        DealStage::Proposal,
        &[
            DealStage::Lead,
            DealStage::Qualified,
            DealStage::Negotiation,
            DealStage::Won,
            DealStage::Lost,
        ],
    ),
    (
        DealStage::Negotiation,
        &[
            DealStage::Lead,
            DealStage::Qualified,
            DealStage::Proposal,
            DealStage::Won,
            DealStage::Lost,
        ],
    ),
    (DealStage::Won, &[]),
    (DealStage::Lost, &[]),
];

/// A validated stage change, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageChange {
    /// The deal after the change.
    pub deal: Deal,
    /// Stage before the change.
    pub from: DealStage,
    /// Stage after the change.
    pub to: DealStage,
    /// Notes for the history row.
    pub notes: Option<String>,
}

/// Stateless deal stage machine.
pub struct DealStageMachine;

impl DealStageMachine {
    /// Initial stage of every new deal.
    pub const INITIAL_STAGE: DealStage = DealStage::Lead;

    /// Returns true if `from → to` is allowed. Identity is always allowed.
    #[must_use]
    pub fn can_transition(from: DealStage, to: DealStage) -> bool {
        from == to
            || DEAL_TRANSITIONS
                .iter()
                .find(|(stage, _)| *stage == from)
                .is_some_and(|(_, targets)| targets.contains(&to))
    }

    /// Generic stage move.
    ///
    /// Returns `Ok(None)` for the identity transition. Entering won or lost
    /// stamps `actual_close_date`; probability always follows `table`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when the move is not in [`DEAL_TRANSITIONS`].
    pub fn advance(
        deal: &Deal,
        target: DealStage,
        notes: Option<String>,
        table: &ProbabilityTable,
        today: NaiveDate,
    ) -> Result<Option<StageChange>, LifecycleError> {
        if deal.stage == target {
            return Ok(None);
        }

        if !Self::can_transition(deal.stage, target) {
            return Err(match deal.stage {
                DealStage::Won => LifecycleError::InvalidTransition(format!(
                    "deal is won and cannot move to {target}"
                )),
                DealStage::Lost => LifecycleError::InvalidTransition(format!(
                    "deal is lost and must be reopened before moving to {target}"
                )),
                from => LifecycleError::transition("deal", from, target),
            });
        }

        let mut next = deal.clone();
        next.stage = target;
        next.probability = table.for_stage(target);
        next.actual_close_date = target.is_closed().then_some(today);

        Ok(Some(StageChange {
            deal: next,
            from: deal.stage,
            to: target,
            notes,
        }))
    }

    /// Closes a deal as won.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the deal is in negotiation.
    pub fn win(
        deal: &Deal,
        notes: Option<String>,
        table: &ProbabilityTable,
        today: NaiveDate,
    ) -> Result<StageChange, LifecycleError> {
        if deal.stage != DealStage::Negotiation {
            return Err(LifecycleError::InvalidTransition(format!(
                "deal must be in negotiation stage to be won, currently {}",
                deal.stage
            )));
        }

        let mut next = deal.clone();
        next.stage = DealStage::Won;
        next.probability = table.for_stage(DealStage::Won);
        next.actual_close_date = Some(today);

        Ok(StageChange {
            deal: next,
            from: deal.stage,
            to: DealStage::Won,
            notes: Some(notes.unwrap_or_else(|| "Deal won".to_string())),
        })
    }

    /// Closes a deal as lost with a reason.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the deal is already won or already lost.
    pub fn lose(
        deal: &Deal,
        category: LossReasonCategory,
        notes: &str,
        table: &ProbabilityTable,
        today: NaiveDate,
    ) -> Result<StageChange, LifecycleError> {
        match deal.stage {
            DealStage::Won => {
                return Err(LifecycleError::InvalidState(
                    "cannot mark a won deal as lost".to_string(),
                ));
            }
            DealStage::Lost => {
                return Err(LifecycleError::InvalidState(
                    "deal is already marked as lost".to_string(),
                ));
            }
            _ => {}
        }

        let notes = notes.trim();
        let mut next = deal.clone();
        next.stage = DealStage::Lost;
        next.probability = table.for_stage(DealStage::Lost);
        next.actual_close_date = Some(today);
        next.lost_reason = notes.to_string();
        next.loss_reason_category = Some(category);

        let history_notes = if notes.is_empty() {
            format!("[{category}]")
        } else {
            format!("[{category}] {notes}")
        };

        Ok(StageChange {
            deal: next,
            from: deal.stage,
            to: DealStage::Lost,
            notes: Some(history_notes),
        })
    }

    /// Returns a lost deal to `lead`, undoing every field [`Self::lose`] set.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the deal is lost.
    pub fn reopen(deal: &Deal, table: &ProbabilityTable) -> Result<StageChange, LifecycleError> {
        if deal.stage != DealStage::Lost {
            return Err(LifecycleError::InvalidState(
                "only lost deals can be reopened".to_string(),
            ));
        }

        let mut next = deal.clone();
        next.stage = Self::INITIAL_STAGE;
        next.probability = table.for_stage(Self::INITIAL_STAGE);
        next.actual_close_date = None;
        next.lost_reason = String::new();
        next.loss_reason_category = None;

        Ok(StageChange {
            deal: next,
            from: DealStage::Lost,
            to: Self::INITIAL_STAGE,
            notes: Some("Deal reopened".to_string()),
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, TimeZone, Utc};
    use kontrakt_shared::Currency;
    use kontrakt_shared::types::{CustomerId, DealId};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::deal::types::{Deal, DealStage, ProbabilityTable};
    use crate::numbering::CompanyId;

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
    }

    pub fn deal_in(stage: DealStage) -> Deal {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        Deal {
            id: DealId(Uuid::from_u128(1)),
            title: "Warehouse roof".to_string(),
            customer_id: CustomerId(Uuid::from_u128(2)),
            company_id: CompanyId::new("tak"),
            owner_id: "u-1".to_string(),
            stage,
            probability: ProbabilityTable::default().for_stage(stage),
            value: Decimal::from(100_000),
            currency: Currency::Nok,
            expected_close_date: None,
            actual_close_date: stage.is_closed().then(today),
            lost_reason: String::new(),
            loss_reason_category: None,
            offer_id: None,
            notes: None,
            version: 1,
            created_at: at,
            updated_at: at,
        }
    }
}
