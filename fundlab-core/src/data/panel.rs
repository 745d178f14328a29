//! Date × fund NAV table and calendar alignment.
//!
//! Observations for different funds rarely share a timeline. The engine works
//! on a panel aligned to the simulation calendar: each fund's last known NAV
//! is carried forward over gaps, and dates before a fund's first observation
//! stay empty (no NAV can be invented there).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// NAV observations on a common date axis, one column per fund.
///
/// Each column has exactly `dates.len()` entries; `None` marks a date with
/// no knowable NAV for that fund.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavPanel {
    /// Common date axis, sorted ascending.
    pub dates: Vec<NaiveDate>,
    pub series: BTreeMap<String, Vec<Option<Decimal>>>,
}

impl NavPanel {
    /// Build a panel from raw per-fund observations. The date axis is the
    /// sorted union of all observation dates.
    pub fn from_observations(
        observations: BTreeMap<String, Vec<(NaiveDate, Decimal)>>,
    ) -> Self {
        let mut all_dates = BTreeSet::new();
        for points in observations.values() {
            for (date, _) in points {
                all_dates.insert(*date);
            }
        }
        let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

        let mut series = BTreeMap::new();
        for (fund_id, points) in observations {
            let by_date: BTreeMap<NaiveDate, Decimal> = points.into_iter().collect();
            let column: Vec<Option<Decimal>> =
                dates.iter().map(|d| by_date.get(d).copied()).collect();
            series.insert(fund_id, column);
        }

        Self { dates, series }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.series.is_empty()
    }

    pub fn contains_fund(&self, fund_id: &str) -> bool {
        self.series.contains_key(fund_id)
    }

    /// NAV for a fund at a date index, if knowable.
    pub fn nav(&self, index: usize, fund_id: &str) -> Option<Decimal> {
        self.series.get(fund_id)?.get(index).copied().flatten()
    }

    /// Project the panel onto `calendar`, forward-filling each fund's last
    /// known NAV. Observations between two calendar days roll onto the next
    /// calendar day; dates before a fund's first observation stay `None`.
    pub fn align(&self, calendar: &[NaiveDate]) -> NavPanel {
        let mut series = BTreeMap::new();
        for (fund_id, column) in &self.series {
            let mut aligned = Vec::with_capacity(calendar.len());
            let mut cursor = 0usize;
            let mut last: Option<Decimal> = None;
            for &day in calendar {
                while cursor < self.dates.len() && self.dates[cursor] <= day {
                    if let Some(nav) = column[cursor] {
                        last = Some(nav);
                    }
                    cursor += 1;
                }
                aligned.push(last);
            }
            series.insert(fund_id.clone(), aligned);
        }
        NavPanel {
            dates: calendar.to_vec(),
            series,
        }
    }
}
