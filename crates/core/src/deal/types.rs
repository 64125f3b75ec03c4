//! Deal domain types.

use chrono::{DateTime, NaiveDate, Utc};
use kontrakt_shared::types::{CustomerId, DealId, HistoryId, OfferId};
use kontrakt_shared::{Currency, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::margin::MarginCalculator;
use crate::numbering::CompanyId;

/// Position of a deal in the sales pipeline.
///
/// `Won` is fully terminal. `Lost` only leaves through an explicit reopen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    /// New opportunity.
    Lead,
    /// Need and budget confirmed.
    Qualified,
    /// Proposal handed over.
    Proposal,
    /// Terms under negotiation.
    Negotiation,
    /// Closed with a signed agreement.
    Won,
    /// Closed without agreement.
    Lost,
}

impl DealStage {
    /// Every stage, in pipeline order.
    pub const ALL: [Self; 6] = [
        Self::Lead,
        Self::Qualified,
        Self::Proposal,
        Self::Negotiation,
        Self::Won,
        Self::Lost,
    ];

    /// Returns the string representation of the stage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Qualified => "qualified",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    /// Parses a stage from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "lead" => Some(Self::Lead),
            "qualified" => Some(Self::Qualified),
            "proposal" => Some(Self::Proposal),
            "negotiation" => Some(Self::Negotiation),
            "won" => Some(Self::Won),
            "lost" => Some(Self::Lost),
            _ => None,
        }
    }

    /// Returns true for won and lost.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a deal was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossReasonCategory {
    /// Too expensive.
    Price,
    /// Wrong time for the customer.
    Timing,
    /// A competitor won.
    Competitor,
    /// Requirements did not fit.
    Requirements,
    /// Anything else.
    Other,
}

impl LossReasonCategory {
    /// Returns the string representation of the category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Timing => "timing",
            Self::Competitor => "competitor",
            Self::Requirements => "requirements",
            Self::Other => "other",
        }
    }

    /// Parses a category from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "price" => Some(Self::Price),
            "timing" => Some(Self::Timing),
            "competitor" => Some(Self::Competitor),
            "requirements" => Some(Self::Requirements),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for LossReasonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default win probability per stage.
///
/// A struct with one field per stage, so every stage always has a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbabilityTable {
    /// Probability for `lead`.
    pub lead: i32,
    /// Probability for `qualified`.
    pub qualified: i32,
    /// Probability for `proposal`.
    pub proposal: i32,
    /// Probability for `negotiation`.
    pub negotiation: i32,
    /// Probability for `won`.
    pub won: i32,
    /// Probability for `lost`.
    pub lost: i32,
}

impl ProbabilityTable {
    /// Probability assigned on entering `stage`.
    #[must_use]
    pub const fn for_stage(&self, stage: DealStage) -> i32 {
        match stage {
            DealStage::Lead => self.lead,
            DealStage::Qualified => self.qualified,
            DealStage::Proposal => self.proposal,
            DealStage::Negotiation => self.negotiation,
            DealStage::Won => self.won,
            DealStage::Lost => self.lost,
        }
    }
}

impl Default for ProbabilityTable {
    fn default() -> Self {
        Self {
            lead: 10,
            qualified: 25,
            proposal: 50,
            negotiation: 75,
            won: 100,
            lost: 0,
        }
    }
}

/// A sales opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    /// Identifier.
    pub id: DealId,
    /// Title.
    pub title: String,
    /// Customer the deal is with.
    pub customer_id: CustomerId,
    /// Company pursuing the deal.
    pub company_id: CompanyId,
    /// Responsible salesperson.
    pub owner_id: String,
    /// Pipeline stage. Only changed by the stage machine.
    pub stage: DealStage,
    /// Win probability, 0 to 100.
    pub probability: i32,
    /// Expected value, never negative.
    pub value: Decimal,
    /// Currency of `value`.
    pub currency: Currency,
    /// Planned close date.
    pub expected_close_date: Option<NaiveDate>,
    /// Set exactly when the deal is won or lost.
    pub actual_close_date: Option<NaiveDate>,
    /// Free-text loss reason; empty unless lost.
    pub lost_reason: String,
    /// Loss category; only set while lost.
    pub loss_reason_category: Option<LossReasonCategory>,
    /// Offer produced from this deal.
    pub offer_id: Option<OfferId>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Optimistic lock counter.
    pub version: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    /// `value × probability / 100`.
    #[must_use]
    pub fn weighted_value(&self) -> Money {
        Money::new(
            MarginCalculator::weighted_value(self.value, self.probability),
            self.currency,
        )
    }
}

/// One row of a deal's append-only stage history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealStageHistory {
    /// Identifier.
    pub id: HistoryId,
    /// Deal the row belongs to.
    pub deal_id: DealId,
    /// Previous stage; `None` for the creation row.
    pub from_stage: Option<DealStage>,
    /// Stage entered.
    pub to_stage: DealStage,
    /// Acting user id.
    pub changed_by_id: String,
    /// Acting user name.
    pub changed_by_name: String,
    /// Optional notes.
    pub notes: Option<String>,
    /// When the change happened.
    pub changed_at: DateTime<Utc>,
    /// Deal version produced by the change; orders rows causally.
    pub deal_version: i32,
}
