//! Portfolio — cash, frozen cash, pending-redemption queue, and holdings.
//!
//! The accounting identity must hold after every mutating operation:
//! `market_value == cash + frozen_cash + sum(pending) + sum(position values)`.

use super::money::{round_cash, round_units};
use super::position::Position;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Redemption proceeds already deducted from a position but not yet liquid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRedeem {
    pub amount: Decimal,
    pub settle_date: NaiveDate,
}

/// Aggregate account state for one strategy under simulation.
///
/// The portfolio exclusively owns its positions. Positions are keyed in a
/// `BTreeMap` so that every iteration over holdings is reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub portfolio_id: String,
    /// Spendable balance.
    pub cash: Decimal,
    /// Cash reserved for in-flight purchase orders.
    pub frozen_cash: Decimal,
    /// Ordered queue of redemption proceeds awaiting their settle date.
    pub pending_redeems: Vec<PendingRedeem>,
    pub positions: BTreeMap<String, Position>,
    /// Absolute amount by which a cash freeze may exceed available cash
    /// before it is rejected; within it the freeze clamps to available cash.
    freeze_tolerance: Decimal,
}

impl Portfolio {
    pub fn new(
        portfolio_id: impl Into<String>,
        initial_cash: Decimal,
        freeze_tolerance: Decimal,
    ) -> Self {
        Self {
            portfolio_id: portfolio_id.into(),
            cash: initial_cash,
            frozen_cash: Decimal::ZERO,
            pending_redeems: Vec::new(),
            positions: BTreeMap::new(),
            freeze_tolerance,
        }
    }

    /// Total account value: cash + frozen cash + pending redemption proceeds
    /// + market value of every position.
    pub fn market_value(&self) -> Decimal {
        let pending: Decimal = self.pending_redeems.iter().map(|p| p.amount).sum();
        let positions: Decimal = self.positions.values().map(|p| p.market_value()).sum();
        round_cash(self.cash + self.frozen_cash + pending + positions)
    }

    pub fn position(&self, fund_id: &str) -> Option<&Position> {
        self.positions.get(fund_id)
    }

    /// Reserve `amount` of spendable cash for an in-flight purchase.
    ///
    /// Fails without mutation when the request exceeds available cash by more
    /// than the tolerance. A request within the tolerance clamps to what is
    /// actually available (absorbing rounding drift). Returns the amount
    /// frozen, or `None` on failure.
    pub fn freeze_cash(&mut self, amount: Decimal) -> Option<Decimal> {
        if amount.is_sign_negative() || amount > self.cash + self.freeze_tolerance {
            return None;
        }
        let frozen = amount.min(self.cash);
        self.cash -= frozen;
        self.frozen_cash += frozen;
        Some(frozen)
    }

    /// Reverse a cash freeze; used on order cancellation.
    pub fn unfreeze_cash(&mut self, amount: Decimal) {
        let released = amount.min(self.frozen_cash);
        debug_assert_eq!(released, amount, "unfreeze exceeds frozen cash");
        self.frozen_cash -= released;
        self.cash += released;
    }

    /// Reserve liquid units of a position for an in-flight redemption.
    /// Fails without mutation when the position lacks sufficient liquid units.
    pub fn freeze_units(&mut self, fund_id: &str, units: Decimal) -> bool {
        if units.is_sign_negative() {
            return false;
        }
        match self.positions.get_mut(fund_id) {
            Some(pos) if units <= pos.units => {
                pos.units -= units;
                pos.frozen_units += units;
                true
            }
            _ => false,
        }
    }

    /// Reverse a unit freeze; used on order cancellation.
    pub fn unfreeze_units(&mut self, fund_id: &str, units: Decimal) {
        if let Some(pos) = self.positions.get_mut(fund_id) {
            let released = units.min(pos.frozen_units);
            debug_assert_eq!(released, units, "unfreeze exceeds frozen units");
            pos.frozen_units -= released;
            pos.units += released;
        }
    }

    /// Convert previously frozen cash into fund units at `nav`.
    ///
    /// `amount` is the gross (frozen) subscription amount; the fee comes out
    /// of it before conversion. Returns the units acquired.
    pub fn execute_purchase(
        &mut self,
        fund_id: &str,
        amount: Decimal,
        nav: Decimal,
        fee: Decimal,
    ) -> Decimal {
        let net = round_cash(amount - fee);
        let units = round_units(net / nav);
        self.frozen_cash = round_cash(self.frozen_cash - amount);
        debug_assert!(!self.frozen_cash.is_sign_negative());

        let pos = self
            .positions
            .entry(fund_id.to_string())
            .or_insert_with(|| Position::new(fund_id));
        pos.apply_purchase(units, nav, amount);
        debug!(
            portfolio = %self.portfolio_id,
            fund = fund_id,
            %amount,
            %units,
            "purchase executed"
        );
        units
    }

    /// Convert previously frozen units into redemption proceeds at `nav`.
    ///
    /// Returns the net amount (gross minus fee). When `add_to_cash` is false
    /// (the normal path — proceeds are delayed) the caller is responsible for
    /// queuing the amount via [`Portfolio::add_pending_redeem`]. The position's
    /// cost basis is untouched; an emptied position is removed.
    pub fn execute_redeem(
        &mut self,
        fund_id: &str,
        units: Decimal,
        nav: Decimal,
        fee: Decimal,
        add_to_cash: bool,
    ) -> Decimal {
        let gross = round_cash(units * nav);
        let net = round_cash(gross - fee);

        if let Some(pos) = self.positions.get_mut(fund_id) {
            debug_assert!(units <= pos.frozen_units, "redeeming more than frozen");
            pos.frozen_units -= units.min(pos.frozen_units);
            pos.nav = nav;
            if pos.is_empty() {
                self.positions.remove(fund_id);
            }
        }
        if add_to_cash {
            self.cash = round_cash(self.cash + net);
        }
        debug!(
            portfolio = %self.portfolio_id,
            fund = fund_id,
            %units,
            %net,
            "redemption executed"
        );
        net
    }

    /// Queue redemption proceeds to become spendable on `settle_date`.
    pub fn add_pending_redeem(&mut self, amount: Decimal, settle_date: NaiveDate) {
        self.pending_redeems.push(PendingRedeem {
            amount,
            settle_date,
        });
    }

    /// Move every queue entry whose settle date has arrived into cash.
    /// Called once per portfolio per day, before any other mutation.
    pub fn settle_pending_redeem(&mut self, today: NaiveDate) -> Decimal {
        let mut settled = Decimal::ZERO;
        self.pending_redeems.retain(|entry| {
            if entry.settle_date <= today {
                settled += entry.amount;
                false
            } else {
                true
            }
        });
        if !settled.is_zero() {
            self.cash = round_cash(self.cash + settled);
        }
        settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn portfolio(cash: Decimal) -> Portfolio {
        Portfolio::new("p1", cash, dec!(0.10))
    }

    #[test]
    fn freeze_cash_moves_balance() {
        let mut p = portfolio(dec!(1000));
        assert_eq!(p.freeze_cash(dec!(400)), Some(dec!(400)));
        assert_eq!(p.cash, dec!(600));
        assert_eq!(p.frozen_cash, dec!(400));
        assert_eq!(p.market_value(), dec!(1000));
    }

    #[test]
    fn freeze_cash_clamps_within_tolerance() {
        let mut p = portfolio(dec!(1000));
        // 0.05 over, inside the 0.10 tolerance: clamp to available cash.
        assert_eq!(p.freeze_cash(dec!(1000.05)), Some(dec!(1000)));
        assert_eq!(p.cash, dec!(0));
        assert_eq!(p.frozen_cash, dec!(1000));
    }

    #[test]
    fn freeze_cash_rejects_beyond_tolerance() {
        let mut p = portfolio(dec!(1000));
        assert_eq!(p.freeze_cash(dec!(1000.11)), None);
        assert_eq!(p.cash, dec!(1000));
        assert_eq!(p.frozen_cash, dec!(0));
    }

    #[test]
    fn unfreeze_cash_reverses_freeze() {
        let mut p = portfolio(dec!(1000));
        p.freeze_cash(dec!(400));
        p.unfreeze_cash(dec!(400));
        assert_eq!(p.cash, dec!(1000));
        assert_eq!(p.frozen_cash, dec!(0));
    }

    #[test]
    fn purchase_converts_frozen_cash_to_units() {
        let mut p = portfolio(dec!(1000000));
        p.freeze_cash(dec!(100000)).unwrap();
        let units = p.execute_purchase("F001", dec!(100000), dec!(1.0), dec!(1500));
        assert_eq!(units, dec!(98500));
        assert_eq!(p.cash, dec!(900000));
        assert_eq!(p.frozen_cash, dec!(0));
        assert_eq!(p.position("F001").unwrap().units, dec!(98500));
        // Fee is gone from the account.
        assert_eq!(p.market_value(), dec!(998500.00));
    }

    #[test]
    fn freeze_units_requires_liquid_units() {
        let mut p = portfolio(dec!(1000));
        p.freeze_cash(dec!(100)).unwrap();
        p.execute_purchase("F001", dec!(100), dec!(1.0), dec!(0));

        assert!(p.freeze_units("F001", dec!(60)));
        assert!(!p.freeze_units("F001", dec!(60))); // only 40 liquid left
        assert!(!p.freeze_units("F999", dec!(1))); // no such position

        let pos = p.position("F001").unwrap();
        assert_eq!(pos.units, dec!(40));
        assert_eq!(pos.frozen_units, dec!(60));
    }

    #[test]
    fn redeem_keeps_cost_and_removes_empty_position() {
        let mut p = portfolio(dec!(100));
        p.freeze_cash(dec!(100)).unwrap();
        p.execute_purchase("F001", dec!(100), dec!(1.0), dec!(0));
        let cost_before = p.position("F001").unwrap().cost;

        assert!(p.freeze_units("F001", dec!(50)));
        let net = p.execute_redeem("F001", dec!(50), dec!(1.2), dec!(0), false);
        assert_eq!(net, dec!(60.00));
        let pos = p.position("F001").unwrap();
        assert_eq!(pos.units, dec!(50));
        assert_eq!(pos.cost, cost_before);

        assert!(p.freeze_units("F001", dec!(50)));
        p.execute_redeem("F001", dec!(50), dec!(1.2), dec!(0), false);
        assert!(p.position("F001").is_none());
    }

    #[test]
    fn pending_redeems_settle_in_date_order() {
        let mut p = portfolio(dec!(0));
        p.add_pending_redeem(dec!(100), date("2024-01-03"));
        p.add_pending_redeem(dec!(50), date("2024-01-05"));

        assert_eq!(p.settle_pending_redeem(date("2024-01-02")), dec!(0));
        assert_eq!(p.settle_pending_redeem(date("2024-01-03")), dec!(100));
        assert_eq!(p.cash, dec!(100));
        assert_eq!(p.pending_redeems.len(), 1);

        assert_eq!(p.settle_pending_redeem(date("2024-01-09")), dec!(50));
        assert_eq!(p.cash, dec!(150));
        assert!(p.pending_redeems.is_empty());
    }

    #[test]
    fn market_value_counts_every_component() {
        let mut p = portfolio(dec!(1000));
        p.freeze_cash(dec!(300)).unwrap();
        p.execute_purchase("F001", dec!(300), dec!(1.5), dec!(0));
        p.add_pending_redeem(dec!(80), date("2024-06-01"));
        p.freeze_cash(dec!(100)).unwrap();

        // cash 600, frozen 100, pending 80, position 200 units * 1.5 = 300
        assert_eq!(p.market_value(), dec!(1080.00));
    }
}
