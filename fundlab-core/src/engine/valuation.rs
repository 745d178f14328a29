//! Mark-to-market and NAV-per-unit computation.

use crate::data::NavPanel;
use crate::domain::{round_cost, Portfolio};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Stateless valuation helpers.
pub struct Valuator;

impl Valuator {
    /// Express market value as a NAV per unit relative to initial capital:
    /// one unit was worth 1.0 at setup.
    pub fn unit_nav(market_value: Decimal, initial_cash: Decimal) -> Decimal {
        if initial_cash <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        round_cost(market_value / initial_cash)
    }

    /// Project a NAV panel onto the simulation calendar (forward-fill).
    pub fn align_panel(panel: &NavPanel, calendar: &[NaiveDate]) -> NavPanel {
        panel.align(calendar)
    }

    /// Mark every position to the day's NAV row. Funds without a knowable
    /// NAV keep their last marked value.
    pub fn mark_positions(portfolio: &mut Portfolio, panel: &NavPanel, index: usize) {
        for (fund_id, position) in portfolio.positions.iter_mut() {
            if let Some(nav) = panel.nav(index, fund_id) {
                if nav > Decimal::ZERO {
                    position.nav = nav;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn unit_nav_is_relative_to_initial_capital() {
        assert_eq!(Valuator::unit_nav(dec!(1000000), dec!(1000000)), dec!(1.0000));
        assert_eq!(Valuator::unit_nav(dec!(1085000), dec!(1000000)), dec!(1.0850));
        assert_eq!(Valuator::unit_nav(dec!(985000), dec!(1000000)), dec!(0.9850));
        assert_eq!(Valuator::unit_nav(dec!(100), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn mark_positions_updates_navs() {
        let mut portfolio = Portfolio::new("p1", dec!(1000), dec!(0.10));
        portfolio.freeze_cash(dec!(500)).unwrap();
        portfolio.execute_purchase("A", dec!(500), dec!(1.0), dec!(0));

        let mut obs = BTreeMap::new();
        obs.insert("A".to_string(), vec![(date("2024-01-02"), dec!(1.10))]);
        let panel = NavPanel::from_observations(obs);

        Valuator::mark_positions(&mut portfolio, &panel, 0);
        assert_eq!(portfolio.position("A").unwrap().nav, dec!(1.10));
        assert_eq!(portfolio.market_value(), dec!(1050.00));
    }

    #[test]
    fn unknown_nav_keeps_last_mark() {
        let mut portfolio = Portfolio::new("p1", dec!(1000), dec!(0.10));
        portfolio.freeze_cash(dec!(500)).unwrap();
        portfolio.execute_purchase("A", dec!(500), dec!(1.25), dec!(0));

        let panel = NavPanel::default();
        Valuator::mark_positions(&mut portfolio, &panel, 0);
        assert_eq!(portfolio.position("A").unwrap().nav, dec!(1.25));
    }
}
