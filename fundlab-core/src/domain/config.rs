//! Immutable per-portfolio simulation parameters.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Engine-wide default purchase fee rate (1.5%).
pub const DEFAULT_PURCHASE_FEE_RATE: Decimal = dec!(0.015);

/// Engine-wide default redemption fee rate (0.5%).
pub const DEFAULT_REDEEM_FEE_RATE: Decimal = dec!(0.005);

/// Default absolute tolerance for cash-freeze clamping.
pub const DEFAULT_FREEZE_TOLERANCE: Decimal = dec!(0.10);

/// Immutable input configuration for one simulated portfolio.
///
/// The three delay parameters are trading-day offsets:
/// - `rebalance_effective_delay`: T+N before a redemption tied to a rebalance
///   is confirmed,
/// - `rebalance_delay`: T+N before the matching purchase is confirmed,
/// - `redeem_settle_delay`: T+N before redeemed cash becomes spendable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    pub initial_cash: Decimal,
    /// First day the portfolio participates in the run. `None` means the
    /// first calendar day.
    pub setup_date: Option<NaiveDate>,
    pub purchase_fee_rate: Decimal,
    pub redeem_fee_rate: Decimal,
    /// Annualized management fee rate, accrued daily on market value.
    pub management_fee_rate: Decimal,
    pub rebalance_delay: usize,
    pub rebalance_effective_delay: usize,
    pub redeem_settle_delay: usize,
    /// Absolute amount by which a cash freeze may overshoot available cash
    /// before being rejected. Kept absolute rather than scaled with portfolio
    /// size so freeze outcomes do not depend on capital level.
    pub freeze_tolerance: Decimal,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            initial_cash: dec!(1000000),
            setup_date: None,
            purchase_fee_rate: DEFAULT_PURCHASE_FEE_RATE,
            redeem_fee_rate: DEFAULT_REDEEM_FEE_RATE,
            management_fee_rate: Decimal::ZERO,
            rebalance_delay: 2,
            rebalance_effective_delay: 1,
            redeem_settle_delay: 2,
            freeze_tolerance: DEFAULT_FREEZE_TOLERANCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_wide_rates() {
        let config = PortfolioConfig::default();
        assert_eq!(config.purchase_fee_rate, dec!(0.015));
        assert_eq!(config.redeem_fee_rate, dec!(0.005));
        assert_eq!(config.management_fee_rate, Decimal::ZERO);
        assert_eq!(config.freeze_tolerance, dec!(0.10));
    }
}
