//! Per-order settlement against the settlement-day NAV.
//!
//! Cancellation is an expected, frequent outcome (a fund can simply have no
//! NAV on a given day), so settlement reports an explicit outcome value
//! instead of an error.

use super::fees::FeeCalculator;
use crate::data::NavPanel;
use crate::domain::{round_cash, Order, OrderSide, Portfolio};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// What happened to a frozen order on its settlement day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Filled,
    Cancelled { reason: String },
}

/// Settle one frozen order due today.
///
/// A missing or non-positive NAV cancels the order and releases the reserved
/// cash or units — no funds move. A Buy converts frozen cash into units; a
/// Sell converts frozen units into pending proceeds that arrive
/// `redeem_settle_delay` trading days later (clamped to the calendar end).
pub fn settle_order(
    order: &mut Order,
    portfolio: &mut Portfolio,
    fees: &FeeCalculator,
    panel: &NavPanel,
    calendar: &[NaiveDate],
    day_index: usize,
    redeem_settle_delay: usize,
) -> SettlementOutcome {
    debug_assert!(order.is_open());

    let nav = match panel.nav(day_index, &order.fund_id) {
        Some(nav) if nav > Decimal::ZERO => nav,
        other => {
            let reason = match other {
                Some(nav) => format!("non-positive NAV {nav} on settlement day"),
                None => "no NAV on settlement day".to_string(),
            };
            match order.side {
                OrderSide::Buy => {
                    portfolio.unfreeze_cash(order.amount.unwrap_or_default());
                }
                OrderSide::Sell => {
                    portfolio.unfreeze_units(&order.fund_id, order.units.unwrap_or_default());
                }
            }
            warn!(order = %order.id, fund = %order.fund_id, %reason, "order cancelled");
            order.cancel(reason.clone());
            return SettlementOutcome::Cancelled { reason };
        }
    };

    match order.side {
        OrderSide::Buy => {
            let amount = order.amount.unwrap_or_default();
            let fee = fees.purchase_fee(&order.fund_id, amount);
            let units = portfolio.execute_purchase(&order.fund_id, amount, nav, fee);
            order.fill(nav, fee);
            debug!(order = %order.id, fund = %order.fund_id, %units, "buy filled");
        }
        OrderSide::Sell => {
            let units = order.units.unwrap_or_default();
            let gross = round_cash(units * nav);
            let fee = fees.redeem_fee(&order.fund_id, gross);
            let net = portfolio.execute_redeem(&order.fund_id, units, nav, fee, false);
            // The cash leg arrives T+redeem_settle_delay, clamped to the
            // last simulated day.
            let arrival_index = (day_index + redeem_settle_delay).min(calendar.len() - 1);
            portfolio.add_pending_redeem(net, calendar[arrival_index]);
            order.fill(nav, fee);
            debug!(order = %order.id, fund = %order.fund_id, %net, "sell filled");
        }
    }
    SettlementOutcome::Filled
}
