//! Rounding helpers for fixed-point money math.
//!
//! Every monetary quantity in the simulator is a `rust_decimal::Decimal`,
//! rounded half-up at a stable precision: 2 decimals for cash, fees, and
//! order amounts; 4 decimals for per-unit cost and unit NAV. Keeping the
//! precision fixed avoids drift across thousands of compounding operations.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places for cash, fees, amounts, and unit quantities.
pub const CASH_DP: u32 = 2;

/// Decimal places for per-unit cost and unit NAV.
pub const COST_DP: u32 = 4;

/// Round a cash amount (2 dp, half-up).
pub fn round_cash(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CASH_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a unit quantity (2 dp, half-up).
pub fn round_units(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CASH_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a per-unit cost or NAV (4 dp, half-up).
pub fn round_cost(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(COST_DP, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cash_rounds_half_up() {
        assert_eq!(round_cash(dec!(1.005)), dec!(1.01));
        assert_eq!(round_cash(dec!(1.004)), dec!(1.00));
        assert_eq!(round_cash(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn cost_keeps_four_decimals() {
        assert_eq!(round_cost(dec!(1.23455)), dec!(1.2346));
        assert_eq!(round_cost(dec!(1.23454)), dec!(1.2345));
    }

    #[test]
    fn rounding_is_stable() {
        let once = round_cash(dec!(99.999));
        assert_eq!(round_cash(once), once);
    }
}
