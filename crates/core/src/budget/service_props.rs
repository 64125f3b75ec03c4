//! Property-based tests for budget aggregation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::service::BudgetService;
use super::service::fixtures::item;
use super::types::BudgetItem;

fn arb_items() -> impl Strategy<Value = Vec<BudgetItem>> {
    prop::collection::vec((0i64..5_000_000, 0i64..100), 0..30).prop_map(|lines| {
        lines
            .into_iter()
            .zip(1u128..)
            .map(|((cost, margin), n)| item(n, cost, margin))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any permutation of the same items summarizes identically.
    #[test]
    fn prop_summary_is_order_invariant(
        (items, shuffled) in arb_items().prop_flat_map(|items| {
            let shuffled = Just(items.clone()).prop_shuffle();
            (Just(items), shuffled)
        })
    ) {
        prop_assert_eq!(
            BudgetService::summarize(&items),
            BudgetService::summarize(&shuffled)
        );
    }

    /// Totals are sums and profit is revenue minus cost.
    #[test]
    fn prop_summary_totals(items in arb_items()) {
        let summary = BudgetService::summarize(&items);
        let cost: Decimal = items.iter().map(|i| i.expected_cost).sum();
        let revenue: Decimal = items.iter().map(|i| i.expected_revenue).sum();
        prop_assert_eq!(summary.total_cost, cost);
        prop_assert_eq!(summary.total_revenue, revenue);
        prop_assert_eq!(summary.total_profit, revenue - cost);
        prop_assert_eq!(summary.item_count, items.len());
    }

    /// Margins in 0..100 never produce negative profit or a margin of 100 or more.
    #[test]
    fn prop_summary_margin_bounded(items in arb_items()) {
        let summary = BudgetService::summarize(&items);
        prop_assert!(summary.total_profit >= Decimal::ZERO);
        prop_assert!(summary.margin_percent >= Decimal::ZERO);
        prop_assert!(summary.margin_percent < Decimal::ONE_HUNDRED);
    }

    /// Reordering with any permutation assigns every position once.
    #[test]
    fn prop_reorder_is_total(
        (ids, order) in arb_items().prop_flat_map(|items| {
            let ids: Vec<_> = items.iter().map(|i| i.id).collect();
            (Just(ids.clone()), Just(ids).prop_shuffle())
        })
    ) {
        let plan = BudgetService::plan_reorder(&ids, &order).unwrap();
        prop_assert_eq!(plan.len(), ids.len());
        for (position, (id, assigned)) in plan.iter().enumerate() {
            prop_assert_eq!(*id, order[position]);
            prop_assert_eq!(usize::try_from(*assigned).unwrap(), position + 1);
        }
    }
}
