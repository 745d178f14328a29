//! In-memory DataProvider used by tests, benchmarks, and embedding callers.

use super::panel::NavPanel;
use super::provider::{
    CalendarKind, DataError, DataProvider, FundFee, NavSeries, NavType,
};
use crate::domain::{PortfolioConfig, RebalanceRecord};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// A fully in-memory data source.
///
/// Populate it with a calendar, NAV observations, and rebalance rows, then
/// hand it to the engine. Lookups slice to the requested date range.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    calendar: Vec<NaiveDate>,
    navs: BTreeMap<String, Vec<(NaiveDate, Decimal)>>,
    rebalances: BTreeMap<String, Vec<RebalanceRecord>>,
    fees: BTreeMap<String, FundFee>,
    configs: BTreeMap<String, PortfolioConfig>,
    benchmarks: BTreeMap<String, Vec<(NaiveDate, Decimal)>>,
}

impl MemoryProvider {
    pub fn new(calendar: Vec<NaiveDate>) -> Self {
        Self {
            calendar,
            ..Default::default()
        }
    }

    pub fn with_nav(
        mut self,
        fund_id: impl Into<String>,
        points: Vec<(NaiveDate, Decimal)>,
    ) -> Self {
        self.navs.insert(fund_id.into(), points);
        self
    }

    pub fn with_rebalances(
        mut self,
        portfolio_id: impl Into<String>,
        records: Vec<RebalanceRecord>,
    ) -> Self {
        self.rebalances.insert(portfolio_id.into(), records);
        self
    }

    pub fn with_fund_fee(mut self, fund_id: impl Into<String>, fee: FundFee) -> Self {
        self.fees.insert(fund_id.into(), fee);
        self
    }

    pub fn with_config(
        mut self,
        portfolio_id: impl Into<String>,
        config: PortfolioConfig,
    ) -> Self {
        self.configs.insert(portfolio_id.into(), config);
        self
    }

    pub fn with_benchmark(
        mut self,
        benchmark_id: impl Into<String>,
        points: Vec<(NaiveDate, Decimal)>,
    ) -> Self {
        self.benchmarks.insert(benchmark_id.into(), points);
        self
    }
}

impl DataProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn trading_calendar(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        _kind: CalendarKind,
    ) -> Result<Vec<NaiveDate>, DataError> {
        let days: Vec<NaiveDate> = self
            .calendar
            .iter()
            .copied()
            .filter(|d| *d >= start && *d <= end)
            .collect();
        if days.is_empty() {
            return Err(DataError::EmptyCalendar { start, end });
        }
        Ok(days)
    }

    fn fund_nav(
        &self,
        fund_ids: &[String],
        start: NaiveDate,
        end: NaiveDate,
        _nav_type: NavType,
    ) -> Result<NavPanel, DataError> {
        let mut observations = BTreeMap::new();
        for fund_id in fund_ids {
            let points = self
                .navs
                .get(fund_id)
                .ok_or_else(|| DataError::MissingNav {
                    fund_id: fund_id.clone(),
                })?;
            let slice: Vec<(NaiveDate, Decimal)> = points
                .iter()
                .copied()
                .filter(|(d, _)| *d >= start && *d <= end)
                .collect();
            observations.insert(fund_id.clone(), slice);
        }
        Ok(NavPanel::from_observations(observations))
    }

    fn rebalance_records(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RebalanceRecord>, DataError> {
        let records = self
            .rebalances
            .get(portfolio_id)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.rebalance_date >= start && r.rebalance_date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    fn fund_fees(&self, fund_ids: &[String]) -> Result<BTreeMap<String, FundFee>, DataError> {
        Ok(fund_ids
            .iter()
            .filter_map(|id| self.fees.get(id).map(|fee| (id.clone(), fee.clone())))
            .collect())
    }

    fn portfolio_config(
        &self,
        portfolio_id: &str,
    ) -> Result<Option<PortfolioConfig>, DataError> {
        Ok(self.configs.get(portfolio_id).cloned())
    }

    fn benchmark_nav(
        &self,
        benchmark_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<NavSeries>, DataError> {
        Ok(self.benchmarks.get(benchmark_id).map(|points| NavSeries {
            id: benchmark_id.to_string(),
            points: points
                .iter()
                .copied()
                .filter(|(d, _)| *d >= start && *d <= end)
                .collect(),
        }))
    }
}
