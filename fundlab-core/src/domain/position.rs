//! A single fund holding: liquid units, frozen units, last NAV, average cost.

use super::money::{round_cash, round_cost};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One position per (portfolio, fund) with outstanding exposure.
///
/// `cost` is the weighted-average acquisition cost (4 dp), defined only by
/// purchases — redeeming units never changes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub fund_id: String,
    /// Units free to redeem.
    pub units: Decimal,
    /// Units reserved for an in-flight redemption order.
    pub frozen_units: Decimal,
    /// Last known NAV per unit.
    pub nav: Decimal,
    /// Weighted-average acquisition cost per unit (gross of fees).
    pub cost: Decimal,
}

impl Position {
    pub fn new(fund_id: impl Into<String>) -> Self {
        Self {
            fund_id: fund_id.into(),
            units: Decimal::ZERO,
            frozen_units: Decimal::ZERO,
            nav: Decimal::ZERO,
            cost: Decimal::ZERO,
        }
    }

    /// Liquid plus frozen units.
    pub fn total_units(&self) -> Decimal {
        self.units + self.frozen_units
    }

    /// Frozen units stay part of the position's value until the redemption
    /// settles.
    pub fn market_value(&self) -> Decimal {
        round_cash(self.total_units() * self.nav)
    }

    pub fn is_empty(&self) -> bool {
        self.total_units().is_zero()
    }

    /// Fold a purchase into the position: add units at `nav` and update the
    /// weighted-average cost over the gross subscription amount.
    pub fn apply_purchase(&mut self, units: Decimal, nav: Decimal, gross_amount: Decimal) {
        let total = self.total_units() + units;
        if !total.is_zero() {
            let carried = self.cost * self.total_units();
            self.cost = round_cost((carried + gross_amount) / total);
        }
        self.units += units;
        self.nav = nav;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn purchase_sets_cost_from_gross_amount() {
        let mut pos = Position::new("F001");
        pos.apply_purchase(dec!(98500), dec!(1.0), dec!(100000));
        assert_eq!(pos.units, dec!(98500));
        // 100_000 / 98_500 = 1.01522842... → 1.0152
        assert_eq!(pos.cost, dec!(1.0152));
    }

    #[test]
    fn repeated_purchases_average_the_cost() {
        let mut pos = Position::new("F001");
        pos.apply_purchase(dec!(100), dec!(1.0), dec!(100));
        pos.apply_purchase(dec!(50), dec!(2.0), dec!(100));
        // (100*1.0 + 100) / 150 = 1.3333
        assert_eq!(pos.cost, dec!(1.3333));
        assert_eq!(pos.units, dec!(150));
        assert_eq!(pos.nav, dec!(2.0));
    }

    #[test]
    fn market_value_includes_frozen_units() {
        let mut pos = Position::new("F001");
        pos.apply_purchase(dec!(100), dec!(1.5), dec!(150));
        pos.units -= dec!(40);
        pos.frozen_units += dec!(40);
        assert_eq!(pos.market_value(), dec!(150.00));
    }
}
