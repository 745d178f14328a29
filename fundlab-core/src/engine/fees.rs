//! Transaction fee lookup: per-fund overrides over portfolio-level rates.

use crate::data::FundFee;
use crate::domain::{round_cash, PortfolioConfig};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Pure function mapping (amount, fund) → fee.
///
/// Rates resolve per fund: an override from the data source wins, otherwise
/// the portfolio's configured rates apply (which default to the engine-wide
/// 1.5% purchase / 0.5% redeem).
#[derive(Debug, Clone)]
pub struct FeeCalculator {
    purchase_rate: Decimal,
    redeem_rate: Decimal,
    overrides: BTreeMap<String, FundFee>,
}

impl FeeCalculator {
    pub fn new(config: &PortfolioConfig, overrides: BTreeMap<String, FundFee>) -> Self {
        Self {
            purchase_rate: config.purchase_fee_rate,
            redeem_rate: config.redeem_fee_rate,
            overrides,
        }
    }

    /// Fee on a gross subscription amount, rounded to cash precision.
    pub fn purchase_fee(&self, fund_id: &str, amount: Decimal) -> Decimal {
        let rate = self
            .overrides
            .get(fund_id)
            .and_then(|fee| fee.purchase_rate)
            .unwrap_or(self.purchase_rate);
        round_cash(amount * rate)
    }

    /// Fee on gross redemption proceeds, rounded to cash precision.
    pub fn redeem_fee(&self, fund_id: &str, gross: Decimal) -> Decimal {
        let rate = self
            .overrides
            .get(fund_id)
            .and_then(|fee| fee.redeem_rate)
            .unwrap_or(self.redeem_rate);
        round_cash(gross * rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn config_rates_apply_without_overrides() {
        let fees = FeeCalculator::new(&PortfolioConfig::default(), BTreeMap::new());
        assert_eq!(fees.purchase_fee("F001", dec!(100000)), dec!(1500.00));
        assert_eq!(fees.redeem_fee("F001", dec!(100000)), dec!(500.00));
    }

    #[test]
    fn fund_override_wins() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "F001".to_string(),
            FundFee {
                purchase_rate: Some(dec!(0.001)),
                redeem_rate: None,
            },
        );
        let fees = FeeCalculator::new(&PortfolioConfig::default(), overrides);
        assert_eq!(fees.purchase_fee("F001", dec!(100000)), dec!(100.00));
        // Redeem side falls back to the config rate.
        assert_eq!(fees.redeem_fee("F001", dec!(100000)), dec!(500.00));
        // Other funds are untouched by the override.
        assert_eq!(fees.purchase_fee("F002", dec!(100000)), dec!(1500.00));
    }

    #[test]
    fn fees_round_to_cash_precision() {
        let fees = FeeCalculator::new(&PortfolioConfig::default(), BTreeMap::new());
        // 333.33 * 0.015 = 4.99995 → 5.00
        assert_eq!(fees.purchase_fee("F001", dec!(333.33)), dec!(5.00));
    }
}
