//! Policy values the lifecycle rules read at runtime.

use kontrakt_shared::Currency;
use kontrakt_shared::config::LifecycleConfig;
use rust_decimal::Decimal;

use crate::deal::{DealStage, ProbabilityTable};
use crate::error::LifecycleError;

/// Lifecycle policy, built once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Days from sent date to expiration date.
    pub offer_validity_days: i64,
    /// Allowed gap between an order's value and synced total income.
    pub dw_income_tolerance: Decimal,
    /// Currency for deals created without one.
    pub default_currency: Currency,
    /// Probability per deal stage.
    pub probabilities: ProbabilityTable,
}

impl LifecycleSettings {
    /// Builds settings from the `lifecycle` configuration section.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an unknown currency, a negative tolerance, a
    /// non-positive validity period or a probability outside 0 to 100.
    pub fn from_config(config: &LifecycleConfig) -> Result<Self, LifecycleError> {
        let default_currency = config
            .default_currency
            .parse()
            .map_err(LifecycleError::InvalidArgument)?;

        if config.dw_income_tolerance < Decimal::ZERO {
            return Err(LifecycleError::InvalidArgument(
                "dw_income_tolerance must not be negative".to_string(),
            ));
        }
        if config.offer_validity_days <= 0 {
            return Err(LifecycleError::InvalidArgument(
                "offer_validity_days must be positive".to_string(),
            ));
        }

        let configured = config.probabilities;
        let probabilities = ProbabilityTable {
            lead: configured.lead,
            qualified: configured.qualified,
            proposal: configured.proposal,
            negotiation: configured.negotiation,
            won: configured.won,
            lost: configured.lost,
        };
        if let Some(stage) = DealStage::ALL
            .into_iter()
            .find(|stage| !(0..=100).contains(&probabilities.for_stage(*stage)))
        {
            return Err(LifecycleError::InvalidArgument(format!(
                "probability for {stage} must be between 0 and 100, got {}",
                probabilities.for_stage(stage)
            )));
        }

        Ok(Self {
            offer_validity_days: config.offer_validity_days,
            dw_income_tolerance: config.dw_income_tolerance,
            default_currency,
            probabilities,
        })
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            offer_validity_days: 60,
            dw_income_tolerance: Decimal::ONE,
            default_currency: Currency::Nok,
            probabilities: ProbabilityTable::default(),
        }
    }
}
