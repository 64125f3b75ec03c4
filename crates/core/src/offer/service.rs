//! Offer creation and edits outside phase changes.

use chrono::{DateTime, NaiveDate, Utc};
use kontrakt_shared::types::{CustomerId, OfferId, ProjectId};
use rust_decimal::Decimal;

use crate::error::LifecycleError;
use crate::numbering::CompanyId;
use crate::offer::machine::OfferPhaseMachine;
use crate::offer::types::{Offer, OfferHealth, OfferPhase, OfferStatus, WarehouseFigures};

/// Probability given to offers created without one.
pub const DEFAULT_OFFER_PROBABILITY: i32 = 50;

/// Input for creating an offer.
#[derive(Debug, Clone, Default)]
pub struct NewOffer {
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Customer; must exist when given.
    pub customer_id: Option<CustomerId>,
    /// Project; must be editable when given.
    pub project_id: Option<ProjectId>,
    /// Issuing company.
    pub company_id: Option<CompanyId>,
    /// Responsible salesperson.
    pub responsible_user_id: Option<String>,
    /// Probability; defaults to [`DEFAULT_OFFER_PROBABILITY`].
    pub probability: Option<i32>,
    /// Offered price.
    pub value: Decimal,
    /// Expected cost.
    pub cost: Decimal,
}

/// Order figures to change; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct OrderProgress {
    /// Cost booked so far.
    pub spent: Option<Decimal>,
    /// Amount invoiced so far.
    pub invoiced: Option<Decimal>,
    /// Replaces the assigned team.
    pub team_members: Option<Vec<String>>,
    /// Forecast end of execution.
    pub estimated_completion_date: Option<NaiveDate>,
}

/// Stateless offer rules outside the phase machine.
pub struct OfferService;

impl OfferService {
    /// Builds a new draft offer.
    pub fn create(id: OfferId, input: NewOffer, now: DateTime<Utc>) -> Result<Offer, LifecycleError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(LifecycleError::InvalidArgument(
                "title must not be empty".to_string(),
            ));
        }
        let probability = input.probability.unwrap_or(DEFAULT_OFFER_PROBABILITY);
        Self::validate_percent("probability", probability)?;
        Self::validate_amounts(input.value, input.cost)?;

        let mut offer = Offer {
            id,
            title: title.to_string(),
            description: input.description,
            customer_id: input.customer_id,
            project_id: input.project_id,
            company_id: input.company_id,
            responsible_user_id: input.responsible_user_id,
            offer_number: None,
            phase: OfferPhaseMachine::INITIAL_PHASE,
            status: OfferStatus::Active,
            probability,
            value: input.value,
            cost: input.cost,
            margin_percent: Decimal::ZERO,
            order_reserve: None,
            sent_date: None,
            expiration_date: None,
            execution: None,
            warehouse: WarehouseFigures::default(),
            version: 1,
            created_at: now,
            updated_at: now,
        };
        offer.recompute_derived();
        Ok(offer)
    }

    /// Changes value and/or cost and recomputes derived fields.
    ///
    /// # Errors
    ///
    /// `InvalidState` for lost or expired offers, `InvalidArgument` for negative amounts.
    pub fn update_financials(
        offer: &Offer,
        value: Option<Decimal>,
        cost: Option<Decimal>,
    ) -> Result<Offer, LifecycleError> {
        if offer.phase.is_closed() {
            return Err(LifecycleError::InvalidState(format!(
                "offer in phase {} cannot change its financials",
                offer.phase
            )));
        }
        let mut next = offer.clone();
        next.value = value.unwrap_or(offer.value);
        next.cost = cost.unwrap_or(offer.cost);
        Self::validate_amounts(next.value, next.cost)?;
        next.recompute_derived();
        Ok(next)
    }

    /// Updates execution health and completion of an order.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the offer is in `order`; `InvalidArgument` for a
    /// completion outside 0 to 100.
    pub fn update_execution(
        offer: &Offer,
        health: Option<OfferHealth>,
        completion_percent: Option<i32>,
    ) -> Result<Offer, LifecycleError> {
        if offer.phase != OfferPhase::Order {
            return Err(LifecycleError::InvalidState(format!(
                "execution can only be updated in order phase, offer is {}",
                offer.phase
            )));
        }
        if let Some(percent) = completion_percent {
            Self::validate_percent("completion", percent)?;
        }

        let mut next = offer.clone();
        let execution = next.execution.as_mut().ok_or_else(|| {
            LifecycleError::InvalidState("order has no execution tracking".to_string())
        })?;
        if let Some(health) = health {
            execution.health = health;
        }
        if let Some(percent) = completion_percent {
            execution.completion_percent = percent;
        }
        next.recompute_derived();
        Ok(next)
    }

    /// Records spend, invoicing, team and forecast of an order.
    ///
    /// The order reserve follows the invoiced amount.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the offer is in `order`; `InvalidArgument` for
    /// negative amounts or a blank team member.
    pub fn record_progress(offer: &Offer, progress: OrderProgress) -> Result<Offer, LifecycleError> {
        if offer.phase != OfferPhase::Order {
            return Err(LifecycleError::InvalidState(format!(
                "order progress can only be recorded in order phase, offer is {}",
                offer.phase
            )));
        }
        for (field, amount) in [("spent", progress.spent), ("invoiced", progress.invoiced)] {
            if let Some(amount) = amount.filter(|amount| *amount < Decimal::ZERO) {
                return Err(LifecycleError::InvalidArgument(format!(
                    "{field} must not be negative, got {amount}"
                )));
            }
        }
        let team_members = progress
            .team_members
            .map(|members| {
                members
                    .into_iter()
                    .map(|member| {
                        let member = member.trim();
                        if member.is_empty() {
                            Err(LifecycleError::InvalidArgument(
                                "team member must not be blank".to_string(),
                            ))
                        } else {
                            Ok(member.to_string())
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        let mut next = offer.clone();
        let execution = next.execution.as_mut().ok_or_else(|| {
            LifecycleError::InvalidState("order has no execution tracking".to_string())
        })?;
        if let Some(spent) = progress.spent {
            execution.spent = spent;
        }
        if let Some(invoiced) = progress.invoiced {
            execution.invoiced = invoiced;
        }
        if let Some(team_members) = team_members {
            execution.team_members = team_members;
        }
        if progress.estimated_completion_date.is_some() {
            execution.estimated_completion_date = progress.estimated_completion_date;
        }
        next.recompute_derived();
        Ok(next)
    }

    /// Replaces the project manager of an order.
    pub fn assign_manager(offer: &Offer, manager_id: String) -> Result<Offer, LifecycleError> {
        let mut next = offer.clone();
        let execution = next.execution.as_mut().ok_or_else(|| {
            LifecycleError::InvalidState(format!(
                "offer in phase {} has no order to manage",
                offer.phase
            ))
        })?;
        execution.manager_id = Some(manager_id);
        Ok(next)
    }

    fn validate_amounts(value: Decimal, cost: Decimal) -> Result<(), LifecycleError> {
        if value < Decimal::ZERO || cost < Decimal::ZERO {
            return Err(LifecycleError::InvalidArgument(format!(
                "value and cost must not be negative, got {value} and {cost}"
            )));
        }
        Ok(())
    }

    fn validate_percent(field: &str, percent: i32) -> Result<(), LifecycleError> {
        if !(0..=100).contains(&percent) {
            return Err(LifecycleError::InvalidArgument(format!(
                "{field} must be between 0 and 100, got {percent}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::machine::fixtures::{draft_offer, offer_in};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_create_draft_with_margin() {
        let offer = OfferService::create(
            OfferId(Uuid::from_u128(3)),
            NewOffer {
                title: "Roof renovation".to_string(),
                value: dec!(1000),
                cost: dec!(800),
                ..NewOffer::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(offer.phase, OfferPhase::Draft);
        assert_eq!(offer.status, OfferStatus::Active);
        assert_eq!(offer.probability, DEFAULT_OFFER_PROBABILITY);
        assert_eq!(offer.margin_percent, dec!(20));
        assert_eq!(offer.order_reserve, None);
        assert_eq!(offer.offer_number, None);
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let bad_probability = NewOffer {
            title: "x".to_string(),
            probability: Some(101),
            ..NewOffer::default()
        };
        assert!(OfferService::create(OfferId(Uuid::nil()), bad_probability, Utc::now()).is_err());

        let negative = NewOffer {
            title: "x".to_string(),
            cost: dec!(-5),
            ..NewOffer::default()
        };
        assert!(OfferService::create(OfferId(Uuid::nil()), negative, Utc::now()).is_err());
    }

    #[test]
    fn test_update_financials_recomputes_margin() {
        let offer = draft_offer();
        let updated = OfferService::update_financials(&offer, Some(dec!(2000)), None).unwrap();
        assert_eq!(updated.margin_percent, dec!(60));

        let zero_value = OfferService::update_financials(&offer, Some(dec!(0)), None).unwrap();
        assert_eq!(zero_value.margin_percent, dec!(0));
    }

    #[test]
    fn test_update_financials_rejected_when_closed() {
        let lost = offer_in(&[OfferPhase::Lost]);
        let err = OfferService::update_financials(&lost, Some(dec!(1)), None).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_STATE");
    }

    #[test]
    fn test_update_execution_only_in_order() {
        let sent = offer_in(&[OfferPhase::InProgress, OfferPhase::Sent]);
        assert!(OfferService::update_execution(&sent, Some(OfferHealth::AtRisk), None).is_err());

        let order = offer_in(&[OfferPhase::InProgress, OfferPhase::Sent, OfferPhase::Order]);
        let updated =
            OfferService::update_execution(&order, Some(OfferHealth::Delayed), Some(40)).unwrap();
        let execution = updated.execution.unwrap();
        assert_eq!(execution.health, OfferHealth::Delayed);
        assert_eq!(execution.completion_percent, 40);

        assert!(OfferService::update_execution(&order, None, Some(120)).is_err());
    }

    #[test]
    fn test_record_progress_moves_order_reserve() {
        let order = offer_in(&[OfferPhase::InProgress, OfferPhase::Sent, OfferPhase::Order]);
        let progressed = OfferService::record_progress(
            &order,
            OrderProgress {
                spent: Some(dec!(300)),
                invoiced: Some(dec!(400)),
                team_members: Some(vec![" kari ".to_string(), "ola".to_string()]),
                ..OrderProgress::default()
            },
        )
        .unwrap();

        assert_eq!(progressed.order_reserve, Some(order.value - dec!(400)));
        let execution = progressed.execution.unwrap();
        assert_eq!(execution.spent, dec!(300));
        assert_eq!(execution.team_members, vec!["kari".to_string(), "ola".to_string()]);
    }

    #[test]
    fn test_record_progress_rejects_bad_input() {
        let order = offer_in(&[OfferPhase::InProgress, OfferPhase::Sent, OfferPhase::Order]);
        let negative = OrderProgress {
            invoiced: Some(dec!(-1)),
            ..OrderProgress::default()
        };
        let err = OfferService::record_progress(&order, negative).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");

        let blank = OrderProgress {
            team_members: Some(vec!["  ".to_string()]),
            ..OrderProgress::default()
        };
        assert!(OfferService::record_progress(&order, blank).is_err());

        let sent = offer_in(&[OfferPhase::InProgress, OfferPhase::Sent]);
        let err = OfferService::record_progress(&sent, OrderProgress::default()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_STATE");
    }

    #[test]
    fn test_assign_manager_requires_order() {
        let draft = draft_offer();
        assert!(OfferService::assign_manager(&draft, "pm-1".to_string()).is_err());

        let order = offer_in(&[OfferPhase::InProgress, OfferPhase::Sent, OfferPhase::Order]);
        let managed = OfferService::assign_manager(&order, "pm-1".to_string()).unwrap();
        assert_eq!(
            managed.execution.unwrap().manager_id.as_deref(),
            Some("pm-1")
        );
    }
}
