//! Margin and revenue arithmetic.
//!
//! Pure functions over `Decimal`. Percentages are rounded to 2 decimals at the
//! end of each calculation, never in between.

use rust_decimal::Decimal;

use crate::error::LifecycleError;

/// Stateless calculator for the derived financial fields.
pub struct MarginCalculator;

impl MarginCalculator {
    /// `(value − cost) / value × 100`, or 0 when `value` is not positive.
    ///
    /// A zero cost on a positive value yields 100. A negative cost is accepted
    /// and yields a margin above 100.
    #[must_use]
    pub fn margin_percent(value: Decimal, cost: Decimal) -> Decimal {
        if value <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        ((value - cost) / value * Decimal::ONE_HUNDRED).round_dp(2)
    }

    /// Revenue that yields `margin_percent` on `cost`: `cost / (1 − margin/100)`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the cost is negative or the margin is outside `0..100`.
    pub fn expected_revenue(cost: Decimal, margin_percent: Decimal) -> Result<Decimal, LifecycleError> {
        Self::validate_cost(cost)?;
        Self::validate_margin(margin_percent)?;

        let divisor = Decimal::ONE - margin_percent / Decimal::ONE_HUNDRED;
        cost.checked_div(divisor)
            .map(|revenue| revenue.round_dp(2))
            .ok_or_else(|| {
                LifecycleError::InvalidArgument(format!(
                    "revenue for cost {cost} at margin {margin_percent} is out of range"
                ))
            })
    }

    /// Revenue minus cost for the given cost and margin.
    pub fn expected_profit(cost: Decimal, margin_percent: Decimal) -> Result<Decimal, LifecycleError> {
        Ok(Self::expected_revenue(cost, margin_percent)? - cost)
    }

    /// `value × probability / 100`, rounded to 2 decimals.
    #[must_use]
    pub fn weighted_value(value: Decimal, probability: i32) -> Decimal {
        (value * Decimal::from(probability) / Decimal::ONE_HUNDRED).round_dp(2)
    }

    /// Value still to be invoiced on an order.
    #[must_use]
    pub fn order_reserve(value: Decimal, invoiced: Decimal) -> Decimal {
        value - invoiced
    }

    /// Rejects negative costs.
    pub fn validate_cost(cost: Decimal) -> Result<(), LifecycleError> {
        if cost < Decimal::ZERO {
            return Err(LifecycleError::InvalidArgument(format!(
                "expected cost must not be negative, got {cost}"
            )));
        }
        Ok(())
    }

    /// Accepts margins in `0..100`; 100 or more would divide by zero or flip the sign.
    pub fn validate_margin(margin_percent: Decimal) -> Result<(), LifecycleError> {
        if margin_percent < Decimal::ZERO || margin_percent >= Decimal::ONE_HUNDRED {
            return Err(LifecycleError::InvalidArgument(format!(
                "expected margin must be at least 0 and below 100, got {margin_percent}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(1000), dec!(0), dec!(100))]
    #[case(dec!(1000), dec!(800), dec!(20))]
    #[case(dec!(0), dec!(800), dec!(0))]
    #[case(dec!(0), dec!(0), dec!(0))]
    #[case(dec!(-50), dec!(10), dec!(0))]
    #[case(dec!(1000), dec!(1200), dec!(-20))]
    #[case(dec!(3), dec!(2), dec!(33.33))]
    fn test_margin_percent(#[case] value: Decimal, #[case] cost: Decimal, #[case] expected: Decimal) {
        assert_eq!(MarginCalculator::margin_percent(value, cost), expected);
    }

    #[rstest]
    #[case(dec!(800), dec!(20), dec!(1000))]
    #[case(dec!(500), dec!(0), dec!(500))]
    #[case(dec!(0), dec!(50), dec!(0))]
    #[case(dec!(750), dec!(25), dec!(1000))]
    fn test_expected_revenue(#[case] cost: Decimal, #[case] margin: Decimal, #[case] expected: Decimal) {
        assert_eq!(MarginCalculator::expected_revenue(cost, margin).unwrap(), expected);
    }

    #[rstest]
    #[case(dec!(100))]
    #[case(dec!(150))]
    #[case(dec!(-0.01))]
    fn test_expected_revenue_rejects_margin(#[case] margin: Decimal) {
        let err = MarginCalculator::expected_revenue(dec!(100), margin).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_expected_revenue_rejects_negative_cost() {
        assert!(MarginCalculator::expected_revenue(dec!(-1), dec!(10)).is_err());
    }

    #[test]
    fn test_expected_profit() {
        assert_eq!(
            MarginCalculator::expected_profit(dec!(800), dec!(20)).unwrap(),
            dec!(200)
        );
    }

    #[test]
    fn test_weighted_value() {
        assert_eq!(MarginCalculator::weighted_value(dec!(100000), 25), dec!(25000));
        assert_eq!(MarginCalculator::weighted_value(dec!(100000), 0), dec!(0));
    }

    #[test]
    fn test_order_reserve() {
        assert_eq!(MarginCalculator::order_reserve(dec!(1000), dec!(250)), dec!(750));
    }
}
