//! Budget line pricing, aggregation and ordering.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use kontrakt_shared::types::BudgetItemId;
use rust_decimal::Decimal;

use super::types::{BudgetItem, BudgetItemChanges, BudgetParent, BudgetSummary, NewBudgetItem};
use crate::error::LifecycleError;
use crate::margin::MarginCalculator;

/// Budget service for business logic.
pub struct BudgetService;

impl BudgetService {
    /// Prices and builds a new item, appending it when no position is given.
    pub fn create_item(
        id: BudgetItemId,
        parent: BudgetParent,
        input: NewBudgetItem,
        existing: &[BudgetItem],
        now: DateTime<Utc>,
    ) -> Result<BudgetItem, LifecycleError> {
        let name = Self::validate_name(&input.name)?;
        let (expected_revenue, expected_profit) =
            Self::price(input.expected_cost, input.expected_margin)?;

        Ok(BudgetItem {
            id,
            parent,
            name,
            expected_cost: input.expected_cost,
            expected_margin: input.expected_margin,
            expected_revenue,
            expected_profit,
            quantity: input.quantity,
            price_per_item: input.price_per_item,
            description: input.description,
            display_order: input
                .display_order
                .unwrap_or_else(|| Self::next_display_order(existing)),
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update and re-derives revenue and profit.
    pub fn apply_changes(
        item: &BudgetItem,
        changes: BudgetItemChanges,
        now: DateTime<Utc>,
    ) -> Result<BudgetItem, LifecycleError> {
        let mut next = item.clone();
        if let Some(name) = changes.name {
            next.name = Self::validate_name(&name)?;
        }
        if let Some(cost) = changes.expected_cost {
            next.expected_cost = cost;
        }
        if let Some(margin) = changes.expected_margin {
            next.expected_margin = margin;
        }
        if let Some(quantity) = changes.quantity {
            next.quantity = quantity;
        }
        if let Some(price) = changes.price_per_item {
            next.price_per_item = price;
        }
        if let Some(description) = changes.description {
            next.description = description;
        }

        let (revenue, profit) = Self::price(next.expected_cost, next.expected_margin)?;
        next.expected_revenue = revenue;
        next.expected_profit = profit;
        next.updated_at = now;
        Ok(next)
    }

    /// Folds items into totals. The result does not depend on item order.
    #[must_use]
    pub fn summarize(items: &[BudgetItem]) -> BudgetSummary {
        let (total_cost, total_revenue) = items.iter().fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(cost, revenue), item| (cost + item.expected_cost, revenue + item.expected_revenue),
        );
        let total_profit = total_revenue - total_cost;
        let margin_percent = MarginCalculator::margin_percent(total_revenue, total_cost);

        BudgetSummary {
            total_cost,
            total_revenue,
            total_profit,
            margin_percent,
            item_count: items.len(),
        }
    }

    /// Position after the current last item; 1 for an empty list.
    #[must_use]
    pub fn next_display_order(items: &[BudgetItem]) -> i32 {
        items
            .iter()
            .map(|item| item.display_order)
            .max()
            .map_or(1, |max| max.saturating_add(1))
    }

    /// Assigns positions `1..=n` following `ordered`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` unless `ordered` holds exactly the ids in `current`,
    /// each once.
    pub fn plan_reorder(
        current: &[BudgetItemId],
        ordered: &[BudgetItemId],
    ) -> Result<Vec<(BudgetItemId, i32)>, LifecycleError> {
        let current_set: HashSet<_> = current.iter().collect();
        let ordered_set: HashSet<_> = ordered.iter().collect();

        if ordered_set.len() != ordered.len() {
            return Err(LifecycleError::InvalidArgument(
                "reorder list contains duplicate ids".to_string(),
            ));
        }
        if current_set != ordered_set {
            return Err(LifecycleError::InvalidArgument(format!(
                "reorder list must contain exactly the parent's {} items",
                current.len()
            )));
        }

        ordered
            .iter()
            .zip(1..)
            .map(|(id, position)| Ok((*id, position)))
            .collect()
    }

    /// Deep-copies items onto another parent, keeping their order.
    pub fn copy_to(
        items: &[BudgetItem],
        parent: BudgetParent,
        mut next_id: impl FnMut() -> BudgetItemId,
        now: DateTime<Utc>,
    ) -> Vec<BudgetItem> {
        items
            .iter()
            .map(|item| BudgetItem {
                id: next_id(),
                parent,
                created_at: now,
                updated_at: now,
                ..item.clone()
            })
            .collect()
    }

    fn price(cost: Decimal, margin: Decimal) -> Result<(Decimal, Decimal), LifecycleError> {
        let revenue = MarginCalculator::expected_revenue(cost, margin)?;
        Ok((revenue, revenue - cost))
    }

    fn validate_name(name: &str) -> Result<String, LifecycleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LifecycleError::InvalidArgument(
                "budget item name must not be empty".to_string(),
            ));
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use kontrakt_shared::types::{BudgetItemId, OfferId};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::BudgetService;
    use crate::budget::types::{BudgetItem, BudgetParent, NewBudgetItem};

    pub fn parent() -> BudgetParent {
        BudgetParent::Offer(OfferId(Uuid::from_u128(100)))
    }

    pub fn item(n: u128, cost: i64, margin: i64) -> BudgetItem {
        BudgetService::create_item(
            BudgetItemId(Uuid::from_u128(n)),
            parent(),
            NewBudgetItem {
                name: format!("line {n}"),
                expected_cost: Decimal::from(cost),
                expected_margin: Decimal::from(margin),
                display_order: i32::try_from(n).ok(),
                ..NewBudgetItem::default()
            },
            &[],
            Utc::now(),
        )
        .unwrap()
    }
}
