//! Deal creation and non-stage edits.

use chrono::{DateTime, NaiveDate, Utc};
use kontrakt_shared::Currency;
use kontrakt_shared::types::{CustomerId, DealId, HistoryId};
use rust_decimal::Decimal;

use crate::access::Actor;
use crate::deal::machine::{DealStageMachine, StageChange};
use crate::deal::types::{Deal, DealStageHistory};
use crate::error::LifecycleError;
use crate::numbering::CompanyId;
use crate::settings::LifecycleSettings;

/// Input for creating a deal.
#[derive(Debug, Clone)]
pub struct NewDeal {
    /// Title.
    pub title: String,
    /// Customer; must exist.
    pub customer_id: CustomerId,
    /// Company pursuing the deal.
    pub company_id: CompanyId,
    /// Owner; defaults to the creating actor.
    pub owner_id: Option<String>,
    /// Expected value.
    pub value: Decimal,
    /// Currency; defaults to the configured currency.
    pub currency: Option<Currency>,
    /// Planned close date.
    pub expected_close_date: Option<NaiveDate>,
    /// Notes.
    pub notes: Option<String>,
}

/// Edits that never touch the stage.
#[derive(Debug, Clone, Default)]
pub struct DealChanges {
    /// New title.
    pub title: Option<String>,
    /// New value.
    pub value: Option<Decimal>,
    /// New currency.
    pub currency: Option<Currency>,
    /// New expected close date; `Some(None)` clears it.
    pub expected_close_date: Option<Option<NaiveDate>>,
    /// New notes; `Some(None)` clears them.
    pub notes: Option<Option<String>>,
}

/// Stateless deal rules outside the stage machine.
pub struct DealService;

impl DealService {
    /// Builds a new deal in the initial stage.
    pub fn create(
        id: DealId,
        input: NewDeal,
        actor: &Actor,
        settings: &LifecycleSettings,
        now: DateTime<Utc>,
    ) -> Result<Deal, LifecycleError> {
        let title = Self::validate_title(&input.title)?;
        Self::validate_value(input.value)?;

        let stage = DealStageMachine::INITIAL_STAGE;
        Ok(Deal {
            id,
            title,
            customer_id: input.customer_id,
            company_id: input.company_id,
            owner_id: input.owner_id.unwrap_or_else(|| actor.user_id.clone()),
            stage,
            probability: settings.probabilities.for_stage(stage),
            value: input.value,
            currency: input.currency.unwrap_or(settings.default_currency),
            expected_close_date: input.expected_close_date,
            actual_close_date: None,
            lost_reason: String::new(),
            loss_reason_category: None,
            offer_id: None,
            notes: input.notes,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies detail edits.
    pub fn apply_changes(deal: &Deal, changes: DealChanges) -> Result<Deal, LifecycleError> {
        let mut next = deal.clone();
        if let Some(title) = changes.title {
            next.title = Self::validate_title(&title)?;
        }
        if let Some(value) = changes.value {
            Self::validate_value(value)?;
            next.value = value;
        }
        if let Some(currency) = changes.currency {
            next.currency = currency;
        }
        if let Some(date) = changes.expected_close_date {
            next.expected_close_date = date;
        }
        if let Some(notes) = changes.notes {
            next.notes = notes;
        }
        Ok(next)
    }

    /// History row written when a deal is created.
    #[must_use]
    pub fn creation_history(
        id: HistoryId,
        deal: &Deal,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> DealStageHistory {
        DealStageHistory {
            id,
            deal_id: deal.id,
            from_stage: None,
            to_stage: deal.stage,
            changed_by_id: actor.user_id.clone(),
            changed_by_name: actor.display_name.clone(),
            notes: Some("Deal created".to_string()),
            changed_at: at,
            deal_version: deal.version,
        }
    }

    /// History row for a stage change whose deal already carries its new version.
    #[must_use]
    pub fn change_history(
        id: HistoryId,
        change: &StageChange,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> DealStageHistory {
        DealStageHistory {
            id,
            deal_id: change.deal.id,
            from_stage: Some(change.from),
            to_stage: change.to,
            changed_by_id: actor.user_id.clone(),
            changed_by_name: actor.display_name.clone(),
            notes: change.notes.clone(),
            changed_at: at,
            deal_version: change.deal.version,
        }
    }

    /// Rejects negative values.
    pub fn validate_value(value: Decimal) -> Result<(), LifecycleError> {
        if value < Decimal::ZERO {
            return Err(LifecycleError::InvalidArgument(format!(
                "deal value must not be negative, got {value}"
            )));
        }
        Ok(())
    }

    fn validate_title(title: &str) -> Result<String, LifecycleError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(LifecycleError::InvalidArgument(
                "title must not be empty".to_string(),
            ));
        }
        Ok(title.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::DealStage;
    use crate::deal::machine::fixtures::deal_in;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn input() -> NewDeal {
        NewDeal {
            title: "  Hall extension ".to_string(),
            customer_id: CustomerId(Uuid::from_u128(5)),
            company_id: CompanyId::new("stalbygg"),
            owner_id: None,
            value: dec!(250000),
            currency: None,
            expected_close_date: None,
            notes: None,
        }
    }

    #[test]
    fn test_create_starts_in_lead() {
        let actor = Actor::new("u-9", "Siri");
        let deal = DealService::create(
            DealId(Uuid::from_u128(1)),
            input(),
            &actor,
            &LifecycleSettings::default(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(deal.stage, DealStage::Lead);
        assert_eq!(deal.probability, 10);
        assert_eq!(deal.title, "Hall extension");
        assert_eq!(deal.owner_id, "u-9");
        assert_eq!(deal.currency, Currency::Nok);
        assert_eq!(deal.actual_close_date, None);
        assert_eq!(deal.version, 1);
    }

    #[test]
    fn test_create_rejects_negative_value_and_blank_title() {
        let actor = Actor::new("u", "U");
        let settings = LifecycleSettings::default();
        let mut bad = input();
        bad.value = dec!(-1);
        assert!(DealService::create(DealId(Uuid::nil()), bad, &actor, &settings, Utc::now()).is_err());

        let mut bad = input();
        bad.title = "   ".to_string();
        assert!(DealService::create(DealId(Uuid::nil()), bad, &actor, &settings, Utc::now()).is_err());
    }

    #[test]
    fn test_apply_changes_leaves_stage_alone() {
        let deal = deal_in(DealStage::Proposal);
        let changed = DealService::apply_changes(
            &deal,
            DealChanges {
                value: Some(dec!(120000)),
                expected_close_date: Some(NaiveDate::from_ymd_opt(2026, 9, 1)),
                ..DealChanges::default()
            },
        )
        .unwrap();
        assert_eq!(changed.stage, DealStage::Proposal);
        assert_eq!(changed.value, dec!(120000));
        assert_eq!(changed.weighted_value().amount, dec!(60000));
    }

    #[test]
    fn test_creation_history_has_no_from_stage() {
        let deal = deal_in(DealStage::Lead);
        let actor = Actor::new("u-1", "Ola");
        let row = DealService::creation_history(HistoryId(Uuid::nil()), &deal, &actor, Utc::now());
        assert_eq!(row.from_stage, None);
        assert_eq!(row.to_stage, DealStage::Lead);
        assert_eq!(row.deal_version, 1);
    }
}
