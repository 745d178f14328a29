//! Subscribe/redeem orders and their lifecycle state machine.

use super::ids::{OrderId, RebalanceId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order direction: subscribe cash into a fund or redeem units out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order lifecycle states.
///
/// `Pending → Frozen` when the reserved cash or units are locked at creation,
/// then `Frozen → Filled` at settlement, or `Frozen → Cancelled` when the
/// settlement-day NAV is missing or non-positive. Filled and Cancelled are
/// terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created, resources not yet reserved.
    Pending,
    /// Cash (Buy) or units (Sell) reserved, waiting for the settlement day.
    Frozen,
    /// Settled: funds converted at the settlement-day NAV.
    Filled,
    /// Cancelled with a reason (missing NAV, non-positive NAV, ...).
    Cancelled { reason: String },
}

/// A single subscribe/redeem instruction.
///
/// `amount` is set for Buy orders (gross cash, fee taken out of it at
/// settlement) and `units` for Sell orders. `nav` and `fee` are filled in
/// at settlement. Orders are created, frozen, and settled entirely within
/// one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub portfolio_id: String,
    pub fund_id: String,
    pub side: OrderSide,
    pub amount: Option<Decimal>,
    pub units: Option<Decimal>,
    pub nav: Option<Decimal>,
    pub fee: Decimal,
    pub status: OrderStatus,
    pub create_date: NaiveDate,
    pub settle_date: NaiveDate,
    pub rebalance_id: Option<RebalanceId>,
}

impl Order {
    pub fn buy(
        id: OrderId,
        portfolio_id: impl Into<String>,
        fund_id: impl Into<String>,
        amount: Decimal,
        create_date: NaiveDate,
        settle_date: NaiveDate,
        rebalance_id: Option<RebalanceId>,
    ) -> Self {
        Self {
            id,
            portfolio_id: portfolio_id.into(),
            fund_id: fund_id.into(),
            side: OrderSide::Buy,
            amount: Some(amount),
            units: None,
            nav: None,
            fee: Decimal::ZERO,
            status: OrderStatus::Pending,
            create_date,
            settle_date,
            rebalance_id,
        }
    }

    pub fn sell(
        id: OrderId,
        portfolio_id: impl Into<String>,
        fund_id: impl Into<String>,
        units: Decimal,
        create_date: NaiveDate,
        settle_date: NaiveDate,
        rebalance_id: Option<RebalanceId>,
    ) -> Self {
        Self {
            id,
            portfolio_id: portfolio_id.into(),
            fund_id: fund_id.into(),
            side: OrderSide::Sell,
            amount: None,
            units: Some(units),
            nav: None,
            fee: Decimal::ZERO,
            status: OrderStatus::Pending,
            create_date,
            settle_date,
            rebalance_id,
        }
    }

    /// Whether the order is still waiting to settle.
    pub fn is_open(&self) -> bool {
        matches!(self.status, OrderStatus::Frozen)
    }

    /// Mark the reserved resources as locked.
    pub fn freeze(&mut self) {
        debug_assert_eq!(self.status, OrderStatus::Pending);
        self.status = OrderStatus::Frozen;
    }

    /// Record the execution price and fee and mark the order filled.
    pub fn fill(&mut self, nav: Decimal, fee: Decimal) {
        debug_assert_eq!(self.status, OrderStatus::Frozen);
        self.nav = Some(nav);
        self.fee = fee;
        self.status = OrderStatus::Filled;
    }

    pub fn cancel(&mut self, reason: impl Into<String>) {
        debug_assert_eq!(self.status, OrderStatus::Frozen);
        self.status = OrderStatus::Cancelled {
            reason: reason.into(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn buy_order_lifecycle() {
        let mut order = Order::buy(
            OrderId(1),
            "p1",
            "F001",
            dec!(100000),
            date("2024-01-02"),
            date("2024-01-04"),
            None,
        );
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.is_open());

        order.freeze();
        assert!(order.is_open());

        order.fill(dec!(1.0), dec!(1500));
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.nav, Some(dec!(1.0)));
        assert_eq!(order.fee, dec!(1500));
        assert!(!order.is_open());
    }

    #[test]
    fn cancelled_order_keeps_reason() {
        let mut order = Order::sell(
            OrderId(2),
            "p1",
            "F001",
            dec!(500),
            date("2024-01-02"),
            date("2024-01-03"),
            None,
        );
        order.freeze();
        order.cancel("no NAV on settlement day");
        assert_eq!(
            order.status,
            OrderStatus::Cancelled {
                reason: "no NAV on settlement day".into()
            }
        );
    }

    #[test]
    fn order_serialization_roundtrip() {
        let order = Order::buy(
            OrderId(7),
            "p1",
            "F002",
            dec!(2500.50),
            date("2024-03-01"),
            date("2024-03-05"),
            Some(RebalanceId(2)),
        );
        let json = serde_json::to_string(&order).unwrap();
        let deser: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(deser.id, order.id);
        assert_eq!(deser.amount, order.amount);
        assert_eq!(deser.rebalance_id, order.rebalance_id);
    }
}
