//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over data sources (in-memory fixtures,
//! an external store) so implementations can be swapped without touching the
//! engine, and mocked for tests.

use super::panel::NavPanel;
use crate::domain::{PortfolioConfig, RebalanceRecord};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Which calendar to walk during the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalendarKind {
    /// Exchange trading days.
    Trading,
    /// Every calendar day.
    Natural,
}

/// Which NAV figure to value against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavType {
    /// Published per-unit NAV.
    Unit,
    /// Dividend-adjusted NAV.
    Adjusted,
}

/// Per-fund fee overrides. `None` falls back to the portfolio's rates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundFee {
    pub purchase_rate: Option<Decimal>,
    pub redeem_rate: Option<Decimal>,
}

/// A dated NAV series (used for benchmarks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavSeries {
    pub id: String,
    pub points: Vec<(NaiveDate, Decimal)>,
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no trading calendar between {start} and {end}")]
    EmptyCalendar { start: NaiveDate, end: NaiveDate },

    #[error("no NAV data for fund '{fund_id}'")]
    MissingNav { fund_id: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Trait for simulation data sources.
///
/// The engine consumes exactly this surface: a calendar, a NAV panel, a
/// rebalance schedule, and optional fee/config/benchmark lookups.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Ordered trading dates covering `[start, end]`.
    fn trading_calendar(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        kind: CalendarKind,
    ) -> Result<Vec<NaiveDate>, DataError>;

    /// Daily NAV observations for the given funds, one column per fund.
    fn fund_nav(
        &self,
        fund_ids: &[String],
        start: NaiveDate,
        end: NaiveDate,
        nav_type: NavType,
    ) -> Result<NavPanel, DataError>;

    /// Target-weight rows for a portfolio, one per (date, fund).
    fn rebalance_records(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RebalanceRecord>, DataError>;

    /// Per-fund fee overrides. Funds without an entry use portfolio rates.
    fn fund_fees(&self, _fund_ids: &[String]) -> Result<BTreeMap<String, FundFee>, DataError> {
        Ok(BTreeMap::new())
    }

    /// Stored configuration for a portfolio, if the source has one.
    fn portfolio_config(
        &self,
        _portfolio_id: &str,
    ) -> Result<Option<PortfolioConfig>, DataError> {
        Ok(None)
    }

    /// Optional comparison NAV series.
    fn benchmark_nav(
        &self,
        _benchmark_id: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Option<NavSeries>, DataError> {
        Ok(None)
    }
}
