//! Run-scoped engine state and result types.

use super::fees::FeeCalculator;
use crate::data::{NavPanel, NavSeries};
use crate::domain::{
    Order, Portfolio, PortfolioConfig, RebalanceId, RebalancePlan, TargetWeight,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One point of the simulated NAV series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub market_value: Decimal,
    /// Market value per initial-capital unit (1.0 at setup).
    pub unit_nav: Decimal,
}

/// End-of-day snapshot of one holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingRecord {
    pub date: NaiveDate,
    pub portfolio_id: String,
    pub fund_id: String,
    pub units: Decimal,
    pub frozen_units: Decimal,
    pub nav: Decimal,
    pub cost: Decimal,
    pub market_value: Decimal,
}

/// A purchase leg scheduled by a non-first rebalance: buys are created only
/// once the redemption leg's cash has had a chance to land.
#[derive(Debug, Clone)]
pub struct PurchaseLeg {
    pub date: NaiveDate,
    pub rebalance_id: RebalanceId,
    pub targets: Vec<TargetWeight>,
}

/// Everything the engine mutates for one portfolio during one run.
///
/// Rebuilt from scratch at the start of every `run()` call so repeated runs
/// on the same engine never leak state.
pub struct PortfolioRun {
    pub portfolio: Portfolio,
    pub config: PortfolioConfig,
    pub fees: FeeCalculator,
    /// NAV panel aligned to the simulation calendar.
    pub panel: NavPanel,
    pub schedule: Vec<RebalancePlan>,
    /// Index of the next plan to trigger.
    pub next_plan: usize,
    /// Whether any rebalance has triggered yet (the first one buys straight
    /// from cash; later ones redeem first).
    pub rebalanced: bool,
    /// Frozen orders waiting for their settlement day, in creation order.
    pub open_orders: Vec<Order>,
    pub purchase_legs: Vec<PurchaseLeg>,
    pub last_fee_accrual: Option<NaiveDate>,
    /// Every settled order, filled or cancelled, in settlement order.
    pub trades: Vec<Order>,
    pub holdings: Vec<HoldingRecord>,
    pub nav_series: Vec<NavPoint>,
    pub benchmark: Option<NavSeries>,
}

impl PortfolioRun {
    pub fn new(
        portfolio_id: impl Into<String>,
        config: PortfolioConfig,
        fees: FeeCalculator,
        panel: NavPanel,
        schedule: Vec<RebalancePlan>,
        benchmark: Option<NavSeries>,
    ) -> Self {
        let portfolio_id = portfolio_id.into();
        let portfolio = Portfolio::new(
            portfolio_id,
            config.initial_cash,
            config.freeze_tolerance,
        );
        Self {
            portfolio,
            config,
            fees,
            panel,
            schedule,
            next_plan: 0,
            rebalanced: false,
            open_orders: Vec::new(),
            purchase_legs: Vec::new(),
            last_fee_accrual: None,
            trades: Vec::new(),
            holdings: Vec::new(),
            nav_series: Vec::new(),
            benchmark,
        }
    }
}

/// Result of a complete run for one portfolio.
///
/// `metrics` stays empty here; the downstream performance-analytics component
/// owns its contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub portfolio_id: String,
    pub nav_series: Vec<NavPoint>,
    /// Daily simple returns of market value, 6 dp.
    pub returns: Vec<(NaiveDate, Decimal)>,
    pub trades: Vec<Order>,
    pub holdings: Vec<HoldingRecord>,
    pub benchmark: Option<NavSeries>,
    pub metrics: serde_json::Map<String, serde_json::Value>,
}

impl BacktestResult {
    /// Stable content hash of the trade and holdings logs. Two runs over
    /// identical inputs must produce identical fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        let trades = serde_json::to_vec(&self.trades).expect("trade log serializes");
        let holdings = serde_json::to_vec(&self.holdings).expect("holdings log serializes");
        hasher.update(&trades);
        hasher.update(&holdings);
        hasher.finalize().to_hex().to_string()
    }
}

/// Daily simple returns from a NAV series, rounded to 6 dp.
pub fn compute_returns(nav_series: &[NavPoint]) -> Vec<(NaiveDate, Decimal)> {
    nav_series
        .windows(2)
        .filter(|w| w[0].market_value > Decimal::ZERO)
        .map(|w| {
            let ret = w[1].market_value / w[0].market_value - Decimal::ONE;
            (w[1].date, ret.round_dp(6))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn point(d: &str, mv: Decimal) -> NavPoint {
        NavPoint {
            date: date(d),
            market_value: mv,
            unit_nav: dec!(1),
        }
    }

    #[test]
    fn returns_are_daily_pct_changes() {
        let series = vec![
            point("2024-01-02", dec!(1000)),
            point("2024-01-03", dec!(1010)),
            point("2024-01-04", dec!(1000)),
        ];
        let returns = compute_returns(&series);
        assert_eq!(returns.len(), 2);
        assert_eq!(returns[0], (date("2024-01-03"), dec!(0.010000)));
        // 1000/1010 - 1 = -0.00990099...
        assert_eq!(returns[1], (date("2024-01-04"), dec!(-0.009901)));
    }

    #[test]
    fn fingerprint_is_stable() {
        let result = BacktestResult {
            portfolio_id: "p1".into(),
            nav_series: vec![point("2024-01-02", dec!(1000))],
            returns: Vec::new(),
            trades: Vec::new(),
            holdings: Vec::new(),
            benchmark: None,
            metrics: serde_json::Map::new(),
        };
        assert_eq!(result.fingerprint(), result.fingerprint());
    }
}
