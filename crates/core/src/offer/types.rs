//! Offer domain types.

use chrono::{DateTime, NaiveDate, Utc};
use kontrakt_shared::types::{CustomerId, OfferId, ProjectId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::margin::MarginCalculator;
use crate::numbering::CompanyId;

/// Lifecycle position of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferPhase {
    /// Inquiry or unsent draft.
    Draft,
    /// Being prepared.
    InProgress,
    /// Sent to the customer.
    Sent,
    /// Accepted; work is being executed.
    Order,
    /// Work delivered.
    Completed,
    /// Rejected by the customer.
    Lost,
    /// Validity ran out.
    Expired,
}

impl OfferPhase {
    /// Every phase.
    pub const ALL: [Self; 7] = [
        Self::Draft,
        Self::InProgress,
        Self::Sent,
        Self::Order,
        Self::Completed,
        Self::Lost,
        Self::Expired,
    ];

    /// Returns the string representation of the phase.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Sent => "sent",
            Self::Order => "order",
            Self::Completed => "completed",
            Self::Lost => "lost",
            Self::Expired => "expired",
        }
    }

    /// Parses a phase from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "in_progress" => Some(Self::InProgress),
            "sent" => Some(Self::Sent),
            "order" => Some(Self::Order),
            "completed" => Some(Self::Completed),
            "lost" => Some(Self::Lost),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Pre-commitment phases.
    #[must_use]
    pub const fn is_sales_phase(&self) -> bool {
        matches!(self, Self::Draft | Self::InProgress | Self::Sent)
    }

    /// Phases with live execution tracking.
    #[must_use]
    pub const fn is_active_phase(&self) -> bool {
        matches!(self, Self::Order | Self::Completed)
    }

    /// Phases that only leave by restarting as a draft.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Lost | Self::Expired)
    }
}

impl fmt::Display for OfferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative visibility, orthogonal to phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    /// Shown in working lists.
    #[default]
    Active,
    /// Hidden from working lists.
    Inactive,
    /// Kept for reference only.
    Archived,
}

impl OfferStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Execution health of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferHealth {
    /// On plan.
    #[default]
    OnTrack,
    /// Needs attention.
    AtRisk,
    /// Behind schedule.
    Delayed,
    /// Spending above plan.
    OverBudget,
}

impl OfferHealth {
    /// Returns the string representation of the health.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OnTrack => "on_track",
            Self::AtRisk => "at_risk",
            Self::Delayed => "delayed",
            Self::OverBudget => "over_budget",
        }
    }

    /// Parses a health value from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "on_track" => Some(Self::OnTrack),
            "at_risk" => Some(Self::AtRisk),
            "delayed" => Some(Self::Delayed),
            "over_budget" => Some(Self::OverBudget),
            _ => None,
        }
    }
}

/// Execution tracking, present from the first entry into `order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExecution {
    /// Project manager for the order.
    pub manager_id: Option<String>,
    /// Assigned team members.
    pub team_members: Vec<String>,
    /// Cost booked so far.
    pub spent: Decimal,
    /// Amount invoiced so far.
    pub invoiced: Decimal,
    /// Health.
    pub health: OfferHealth,
    /// Completion, 0 to 100.
    pub completion_percent: i32,
    /// Start of execution.
    pub start_date: Option<NaiveDate>,
    /// End of execution.
    pub end_date: Option<NaiveDate>,
    /// Forecast end of execution.
    pub estimated_completion_date: Option<NaiveDate>,
}

impl OrderExecution {
    /// Fresh tracking for an order starting on `start_date`.
    #[must_use]
    pub fn started(start_date: NaiveDate) -> Self {
        Self {
            manager_id: None,
            team_members: Vec::new(),
            spent: Decimal::ZERO,
            invoiced: Decimal::ZERO,
            health: OfferHealth::OnTrack,
            completion_percent: 0,
            start_date: Some(start_date),
            end_date: None,
            estimated_completion_date: None,
        }
    }
}

/// Figures written by the external data-warehouse sync. Read-only here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseFigures {
    /// Total booked income.
    pub total_income: Decimal,
    /// Material costs.
    pub material_costs: Decimal,
    /// Employee costs.
    pub employee_costs: Decimal,
    /// Other costs.
    pub other_costs: Decimal,
    /// Net result.
    pub net_result: Decimal,
    /// Fixed price total.
    pub total_fixed_price: Decimal,
    /// Last successful sync; `None` if never synced.
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Non-fatal data-integrity warning attached to an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum OfferWarning {
    /// The order value differs from the synced total income.
    #[serde(rename = "value.not.equals.dwTotalIncome")]
    ValueNotEqualsDwTotalIncome {
        /// Offer value.
        value: Decimal,
        /// Synced total income.
        dw_total_income: Decimal,
    },
}

impl OfferWarning {
    /// Stable warning code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ValueNotEqualsDwTotalIncome { .. } => "value.not.equals.dwTotalIncome",
        }
    }
}

/// A proposal that becomes the execution record once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Identifier.
    pub id: OfferId,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Customer.
    pub customer_id: Option<CustomerId>,
    /// Project the offer belongs to.
    pub project_id: Option<ProjectId>,
    /// Company issuing the offer.
    pub company_id: Option<CompanyId>,
    /// Responsible salesperson.
    pub responsible_user_id: Option<String>,
    /// Human-readable number; permanent once allocated.
    pub offer_number: Option<String>,
    /// Lifecycle phase.
    pub phase: OfferPhase,
    /// Administrative visibility.
    pub status: OfferStatus,
    /// Win probability, 0 to 100.
    pub probability: i32,
    /// Offered price.
    pub value: Decimal,
    /// Expected cost.
    pub cost: Decimal,
    /// Derived from value and cost.
    pub margin_percent: Decimal,
    /// Derived `value − invoiced`; `None` before the first order.
    pub order_reserve: Option<Decimal>,
    /// When the offer was sent.
    pub sent_date: Option<NaiveDate>,
    /// When the sent offer lapses.
    pub expiration_date: Option<NaiveDate>,
    /// Execution tracking; present once the offer has been an order.
    pub execution: Option<OrderExecution>,
    /// Externally synced figures.
    pub warehouse: WarehouseFigures,
    /// Optimistic lock counter.
    pub version: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    /// Recomputes every derived field from its inputs.
    pub fn recompute_derived(&mut self) {
        self.margin_percent = MarginCalculator::margin_percent(self.value, self.cost);
        self.order_reserve = self
            .execution
            .as_ref()
            .map(|execution| MarginCalculator::order_reserve(self.value, execution.invoiced));
    }

    /// Data-integrity warnings for the current state.
    ///
    /// Only orders that have been synced at least once are checked.
    #[must_use]
    pub fn warnings(&self, tolerance: Decimal) -> Vec<OfferWarning> {
        let mut warnings = Vec::new();
        if self.phase == OfferPhase::Order
            && self.warehouse.last_synced_at.is_some()
            && (self.value - self.warehouse.total_income).abs() > tolerance
        {
            warnings.push(OfferWarning::ValueNotEqualsDwTotalIncome {
                value: self.value,
                dw_total_income: self.warehouse.total_income,
            });
        }
        warnings
    }
}
