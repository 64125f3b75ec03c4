//! Budget line item types.

use chrono::{DateTime, Utc};
use kontrakt_shared::types::{BudgetItemId, OfferId, ProjectId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::LifecycleError;

/// Discriminant of a [`BudgetParent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetParentType {
    /// Items of an offer.
    Offer,
    /// Items of a project.
    Project,
}

impl BudgetParentType {
    /// Returns the stored discriminant.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Project => "project",
        }
    }

    /// Parses a stored discriminant.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "offer" => Some(Self::Offer),
            "project" => Some(Self::Project),
            _ => None,
        }
    }
}

impl fmt::Display for BudgetParentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one entity a budget item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum BudgetParent {
    /// An offer.
    Offer(OfferId),
    /// A project.
    Project(ProjectId),
}

impl BudgetParent {
    /// Rebuilds a parent from its stored `(type, id)` pair.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an unknown discriminant.
    pub fn from_parts(parent_type: &str, id: Uuid) -> Result<Self, LifecycleError> {
        match BudgetParentType::parse(parent_type) {
            Some(BudgetParentType::Offer) => Ok(Self::Offer(OfferId(id))),
            Some(BudgetParentType::Project) => Ok(Self::Project(ProjectId(id))),
            None => Err(LifecycleError::InvalidArgument(format!(
                "unknown budget parent type '{parent_type}'"
            ))),
        }
    }

    /// Discriminant of this parent.
    #[must_use]
    pub const fn parent_type(&self) -> BudgetParentType {
        match self {
            Self::Offer(_) => BudgetParentType::Offer,
            Self::Project(_) => BudgetParentType::Project,
        }
    }

    /// Raw id of the parent entity.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        match self {
            Self::Offer(id) => id.0,
            Self::Project(id) => id.0,
        }
    }
}

impl fmt::Display for BudgetParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.parent_type(), self.id())
    }
}

/// A user-defined cost line with a target margin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetItem {
    /// Identifier.
    pub id: BudgetItemId,
    /// Owning offer or project.
    pub parent: BudgetParent,
    /// Line name.
    pub name: String,
    /// Expected cost, never negative.
    pub expected_cost: Decimal,
    /// Target margin percent, 0 up to but excluding 100.
    pub expected_margin: Decimal,
    /// Derived: `cost / (1 − margin/100)`.
    pub expected_revenue: Decimal,
    /// Derived: `revenue − cost`.
    pub expected_profit: Decimal,
    /// Optional quantity.
    pub quantity: Option<Decimal>,
    /// Optional unit price.
    pub price_per_item: Option<Decimal>,
    /// Optional description.
    pub description: Option<String>,
    /// Position in lists.
    pub display_order: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

/// Input for a new budget line.
#[derive(Debug, Clone, Default)]
pub struct NewBudgetItem {
    /// Line name.
    pub name: String,
    /// Expected cost.
    pub expected_cost: Decimal,
    /// Target margin percent.
    pub expected_margin: Decimal,
    /// Optional quantity.
    pub quantity: Option<Decimal>,
    /// Optional unit price.
    pub price_per_item: Option<Decimal>,
    /// Optional description.
    pub description: Option<String>,
    /// Position; appended after the last item when `None`.
    pub display_order: Option<i32>,
}

/// Partial update of a budget line.
#[derive(Debug, Clone, Default)]
pub struct BudgetItemChanges {
    /// New name.
    pub name: Option<String>,
    /// New expected cost.
    pub expected_cost: Option<Decimal>,
    /// New target margin.
    pub expected_margin: Option<Decimal>,
    /// New quantity; `Some(None)` clears it.
    pub quantity: Option<Option<Decimal>>,
    /// New unit price; `Some(None)` clears it.
    pub price_per_item: Option<Option<Decimal>>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
}

/// Totals over a parent's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BudgetSummary {
    /// Sum of expected costs.
    pub total_cost: Decimal,
    /// Sum of expected revenues.
    pub total_revenue: Decimal,
    /// `total_revenue − total_cost`.
    pub total_profit: Decimal,
    /// `total_profit / total_revenue × 100`, 0 without revenue.
    pub margin_percent: Decimal,
    /// Number of items.
    pub item_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_from_parts() {
        let id = Uuid::from_u128(9);
        let parent = BudgetParent::from_parts("offer", id).unwrap();
        assert_eq!(parent, BudgetParent::Offer(OfferId(id)));
        assert_eq!(parent.parent_type(), BudgetParentType::Offer);
        assert_eq!(parent.id(), id);

        let parent = BudgetParent::from_parts("project", id).unwrap();
        assert_eq!(parent.parent_type().as_str(), "project");
    }

    #[test]
    fn test_parent_rejects_unknown_type() {
        assert!(BudgetParent::from_parts("customer", Uuid::nil()).is_err());
        assert!(BudgetParent::from_parts("", Uuid::nil()).is_err());
    }
}
