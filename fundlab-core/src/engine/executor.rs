//! Weight-delta rebalancing: turn target weights into candidate orders.

use crate::domain::{round_cash, round_units, OrderSide, Portfolio, TargetWeight};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::warn;

/// Weight deltas below this dead-band produce no order, to avoid
/// churn-generating micro-trades.
pub const DEFAULT_DEAD_BAND: Decimal = dec!(0.001);

/// A not-yet-created order: fund, direction, and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOrder {
    pub fund_id: String,
    pub side: OrderSide,
    /// Gross cash amount for Buy candidates.
    pub amount: Option<Decimal>,
    /// Units for Sell candidates.
    pub units: Option<Decimal>,
}

/// Stateless translator from target weights to candidate orders.
#[derive(Debug, Clone)]
pub struct TradeExecutor {
    dead_band: Decimal,
}

impl Default for TradeExecutor {
    fn default() -> Self {
        Self {
            dead_band: DEFAULT_DEAD_BAND,
        }
    }
}

impl TradeExecutor {
    pub fn with_dead_band(dead_band: Decimal) -> Self {
        Self { dead_band }
    }

    /// Compute the signed weight delta per fund against current holdings and
    /// emit a candidate order where it exceeds the dead-band.
    ///
    /// Held funds absent from the targets are treated as a zero target (full
    /// sell). Sell sizes clamp to liquid units; a delta within one rounding
    /// step of the whole position liquidates it outright.
    pub fn rebalance_candidates(
        &self,
        portfolio: &Portfolio,
        targets: &[TargetWeight],
    ) -> Vec<CandidateOrder> {
        let total = portfolio.market_value();
        if total <= Decimal::ZERO {
            return Vec::new();
        }

        let mut target_weights: BTreeMap<&str, Decimal> = BTreeMap::new();
        for target in targets {
            *target_weights.entry(target.fund_id.as_str()).or_default() += target.weight;
        }
        // Held funds missing from the target set get an implicit zero weight.
        let mut universe: Vec<&str> = target_weights.keys().copied().collect();
        for fund_id in portfolio.positions.keys() {
            if !target_weights.contains_key(fund_id.as_str()) {
                universe.push(fund_id);
            }
        }
        universe.sort_unstable();

        let mut candidates = Vec::new();
        for fund_id in universe {
            let target = target_weights.get(fund_id).copied().unwrap_or(Decimal::ZERO);
            let position = portfolio.position(fund_id);
            let held_value = position.map(|p| p.market_value()).unwrap_or(Decimal::ZERO);
            let current = held_value / total;
            let delta = target - current;

            if delta > self.dead_band {
                candidates.push(CandidateOrder {
                    fund_id: fund_id.to_string(),
                    side: OrderSide::Buy,
                    amount: Some(round_cash(delta * total)),
                    units: None,
                });
            } else if delta < -self.dead_band {
                let pos = match position {
                    Some(p) if p.nav > Decimal::ZERO => p,
                    _ => {
                        warn!(fund = fund_id, "cannot size sell without a marked NAV");
                        continue;
                    }
                };
                let mut units = round_units(-delta * total / pos.nav);
                // Within one rounding step of the full position: clear it out.
                if (pos.units - units).abs() <= dec!(0.01) || units > pos.units {
                    units = pos.units;
                }
                if units > Decimal::ZERO {
                    candidates.push(CandidateOrder {
                        fund_id: fund_id.to_string(),
                        side: OrderSide::Sell,
                        amount: None,
                        units: Some(units),
                    });
                }
            }
        }
        candidates
    }

    /// Scale Buy candidate amounts down proportionally so their sum never
    /// exceeds `available` cash. Sell candidates pass through unchanged.
    pub fn scale_to_cash(
        &self,
        mut candidates: Vec<CandidateOrder>,
        available: Decimal,
    ) -> Vec<CandidateOrder> {
        let wanted: Decimal = candidates
            .iter()
            .filter(|c| c.side == OrderSide::Buy)
            .filter_map(|c| c.amount)
            .sum();
        if wanted <= available || wanted.is_zero() {
            return candidates;
        }
        let factor = available / wanted;
        for candidate in &mut candidates {
            if candidate.side == OrderSide::Buy {
                if let Some(amount) = candidate.amount {
                    candidate.amount = Some(round_cash(amount * factor));
                }
            }
        }
        candidates
    }
}
