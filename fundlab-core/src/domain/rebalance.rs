//! Target-weight rebalance records and per-date plans.
//!
//! Provider rows arrive as one row per (date, fund). The engine works with
//! per-date plans: rows grouped by date, weights normalized, sorted ascending.
//! A plan is the active target during the window `[date, next plan date)`.

use super::ids::RebalanceId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Tolerated deviation of a weight sum from 1 before renormalizing.
pub const WEIGHT_SUM_TOLERANCE: Decimal = dec!(0.01);

/// One provider row: a target weight for one fund on one rebalance date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceRecord {
    pub rebalance_date: NaiveDate,
    pub fund_id: String,
    pub fund_name: String,
    pub target_weight: Decimal,
}

/// A normalized target weight within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetWeight {
    pub fund_id: String,
    pub fund_name: String,
    pub weight: Decimal,
}

/// All target weights taking effect on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalancePlan {
    pub id: RebalanceId,
    pub date: NaiveDate,
    pub targets: Vec<TargetWeight>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WeightError {
    #[error("target weights on {date} sum to {sum}, expected a positive total")]
    NonPositiveSum { date: NaiveDate, sum: Decimal },
}

/// Rescale weights to sum to 1 when they deviate by more than the tolerance.
///
/// Renormalizing an already-normalized set is a no-op. A non-positive sum is
/// a configuration error for the date.
pub fn normalize_weights(
    date: NaiveDate,
    targets: &mut [TargetWeight],
) -> Result<(), WeightError> {
    let sum: Decimal = targets.iter().map(|t| t.weight).sum();
    if sum <= Decimal::ZERO {
        return Err(WeightError::NonPositiveSum { date, sum });
    }
    if (sum - Decimal::ONE).abs() > WEIGHT_SUM_TOLERANCE {
        warn!(%date, %sum, "target weights deviate from 1, rescaling");
        for target in targets.iter_mut() {
            target.weight /= sum;
        }
    }
    Ok(())
}

/// Group records into per-date plans with normalized weights.
///
/// Dates whose weights cannot be normalized are dropped with a warning; the
/// run continues with the remaining plans.
pub fn build_schedule(records: Vec<RebalanceRecord>) -> Vec<RebalancePlan> {
    let mut by_date: BTreeMap<NaiveDate, Vec<TargetWeight>> = BTreeMap::new();
    for record in records {
        by_date
            .entry(record.rebalance_date)
            .or_default()
            .push(TargetWeight {
                fund_id: record.fund_id,
                fund_name: record.fund_name,
                weight: record.target_weight,
            });
    }

    let mut plans = Vec::with_capacity(by_date.len());
    let mut seq = 0u32;
    for (date, mut targets) in by_date {
        if let Err(err) = normalize_weights(date, &mut targets) {
            warn!(%date, %err, "dropping rebalance date");
            continue;
        }
        seq += 1;
        plans.push(RebalancePlan {
            id: RebalanceId(seq),
            date,
            targets,
        });
    }
    plans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(d: &str, fund: &str, weight: Decimal) -> RebalanceRecord {
        RebalanceRecord {
            rebalance_date: date(d),
            fund_id: fund.into(),
            fund_name: format!("Fund {fund}"),
            target_weight: weight,
        }
    }

    #[test]
    fn normalized_set_is_left_alone() {
        let mut targets = vec![
            TargetWeight {
                fund_id: "A".into(),
                fund_name: "A".into(),
                weight: dec!(0.6),
            },
            TargetWeight {
                fund_id: "B".into(),
                fund_name: "B".into(),
                weight: dec!(0.4),
            },
        ];
        let before = targets.clone();
        normalize_weights(date("2024-01-02"), &mut targets).unwrap();
        assert_eq!(targets, before);
    }

    #[test]
    fn deviating_set_is_rescaled_and_idempotent() {
        let mut targets = vec![
            TargetWeight {
                fund_id: "A".into(),
                fund_name: "A".into(),
                weight: dec!(0.6),
            },
            TargetWeight {
                fund_id: "B".into(),
                fund_name: "B".into(),
                weight: dec!(0.6),
            },
        ];
        normalize_weights(date("2024-01-02"), &mut targets).unwrap();
        assert_eq!(targets[0].weight, dec!(0.5));
        assert_eq!(targets[1].weight, dec!(0.5));

        // Re-normalizing the result is a no-op.
        let rescaled = targets.clone();
        normalize_weights(date("2024-01-02"), &mut targets).unwrap();
        assert_eq!(targets, rescaled);
    }

    #[test]
    fn zero_sum_is_a_configuration_error() {
        let mut targets = vec![TargetWeight {
            fund_id: "A".into(),
            fund_name: "A".into(),
            weight: Decimal::ZERO,
        }];
        let err = normalize_weights(date("2024-01-02"), &mut targets).unwrap_err();
        assert!(matches!(err, WeightError::NonPositiveSum { .. }));
    }

    #[test]
    fn schedule_groups_by_date_and_sorts() {
        let plans = build_schedule(vec![
            record("2024-03-01", "B", dec!(0.5)),
            record("2024-01-02", "A", dec!(1.0)),
            record("2024-03-01", "A", dec!(0.5)),
        ]);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].id, RebalanceId(1));
        assert_eq!(plans[0].date, date("2024-01-02"));
        assert_eq!(plans[0].targets.len(), 1);
        assert_eq!(plans[1].date, date("2024-03-01"));
        assert_eq!(plans[1].targets.len(), 2);
    }

    #[test]
    fn schedule_drops_unnormalizable_dates() {
        let plans = build_schedule(vec![
            record("2024-01-02", "A", dec!(1.0)),
            record("2024-02-01", "A", Decimal::ZERO),
        ]);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].date, date("2024-01-02"));
    }
}
