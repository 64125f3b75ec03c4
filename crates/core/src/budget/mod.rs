//! Budget line items and their aggregation.
//!
//! Items belong to exactly one offer or project. Revenue and profit are
//! derived from cost and margin; parent totals are folds over the items.

pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use service::BudgetService;
pub use types::{
    BudgetItem, BudgetItemChanges, BudgetParent, BudgetParentType, BudgetSummary, NewBudgetItem,
};
