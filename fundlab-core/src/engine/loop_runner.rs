//! The engine: walks the trading calendar day by day and drives settlement,
//! rebalancing, valuation, and fee accrual for every registered portfolio.
//!
//! Daily order of operations per portfolio:
//! 1. matured redemption proceeds become spendable cash,
//! 2. frozen orders due today settle,
//! 3. rebalance plans whose date has arrived trigger, and purchase legs
//!    scheduled by earlier rebalances execute,
//! 4. a second settlement pass picks up orders created today that settle
//!    today,
//! 5. positions are marked to the day's NAV row,
//! 6. the management fee accrues,
//! 7. the NAV point and holding snapshots are recorded.

use super::executor::{CandidateOrder, TradeExecutor};
use super::fees::FeeCalculator;
use super::settlement::settle_order;
use super::state::{
    compute_returns, BacktestResult, HoldingRecord, NavPoint, PortfolioRun, PurchaseLeg,
};
use super::valuation::Valuator;
use crate::data::{CalendarKind, DataError, DataProvider, NavPanel, NavType};
use crate::domain::{
    build_schedule, round_cash, IdGen, Order, OrderSide, PortfolioConfig, RebalancePlan,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

const DAYS_PER_YEAR: Decimal = dec!(365);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no portfolios registered")]
    NoPortfolios,

    #[error("empty NAV panel for portfolio '{portfolio_id}'")]
    EmptyNavPanel { portfolio_id: String },

    #[error(transparent)]
    Data(#[from] DataError),
}

/// One portfolio to simulate. `config` and `benchmark_id` override whatever
/// the data provider stores.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub portfolio_id: String,
    pub config: Option<PortfolioConfig>,
    pub benchmark_id: Option<String>,
}

/// The simulation driver. Register portfolios, then `run` a date range.
///
/// All run-scoped state lives in [`PortfolioRun`] values rebuilt per call, so
/// the same engine can be run repeatedly and identical inputs yield identical
/// output (including order IDs).
pub struct BacktestEngine {
    provider: Box<dyn DataProvider>,
    executor: TradeExecutor,
    registrations: Vec<Registration>,
}

impl BacktestEngine {
    pub fn new(provider: Box<dyn DataProvider>) -> Self {
        Self {
            provider,
            executor: TradeExecutor::default(),
            registrations: Vec::new(),
        }
    }

    /// Register a portfolio with provider-supplied (or default) configuration.
    pub fn register(&mut self, portfolio_id: impl Into<String>) {
        self.register_with(Registration {
            portfolio_id: portfolio_id.into(),
            ..Registration::default()
        });
    }

    pub fn register_with(&mut self, registration: Registration) {
        self.registrations.push(registration);
    }

    /// Simulate every registered portfolio over `[start, end]`.
    pub fn run(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BacktestResult>, EngineError> {
        if self.registrations.is_empty() {
            return Err(EngineError::NoPortfolios);
        }
        let calendar = self
            .provider
            .trading_calendar(start, end, CalendarKind::Trading)?;
        if calendar.is_empty() {
            return Err(DataError::EmptyCalendar { start, end }.into());
        }

        let mut runs = self.prepare_runs(&calendar, start, end)?;
        let mut id_gen = IdGen::default();

        info!(
            provider = self.provider.name(),
            days = calendar.len(),
            portfolios = runs.len(),
            %start,
            %end,
            "run started"
        );
        for (index, &day) in calendar.iter().enumerate() {
            for run in runs.iter_mut() {
                self.step_day(run, &calendar, index, day, &mut id_gen);
            }
        }

        let results: Vec<BacktestResult> = runs
            .into_iter()
            .map(|run| {
                let returns = compute_returns(&run.nav_series);
                BacktestResult {
                    portfolio_id: run.portfolio.portfolio_id,
                    nav_series: run.nav_series,
                    returns,
                    trades: run.trades,
                    holdings: run.holdings,
                    benchmark: run.benchmark,
                    metrics: serde_json::Map::new(),
                }
            })
            .collect();
        for result in &results {
            info!(
                portfolio = %result.portfolio_id,
                trades = result.trades.len(),
                nav_points = result.nav_series.len(),
                "portfolio simulated"
            );
        }
        Ok(results)
    }

    fn prepare_runs(
        &self,
        calendar: &[NaiveDate],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PortfolioRun>, EngineError> {
        let mut runs = Vec::with_capacity(self.registrations.len());
        for registration in &self.registrations {
            let portfolio_id = registration.portfolio_id.clone();
            let config = match &registration.config {
                Some(config) => config.clone(),
                None => self
                    .provider
                    .portfolio_config(&portfolio_id)?
                    .unwrap_or_default(),
            };

            let records = self
                .provider
                .rebalance_records(&portfolio_id, start, end)?;
            let schedule = build_schedule(records);
            let fund_ids: Vec<String> = schedule
                .iter()
                .flat_map(|plan| plan.targets.iter().map(|t| t.fund_id.clone()))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let panel = if fund_ids.is_empty() {
                warn!(portfolio = %portfolio_id, "no rebalance targets, simulating cash only");
                NavPanel::default().align(calendar)
            } else {
                let panel = self
                    .provider
                    .fund_nav(&fund_ids, start, end, NavType::Unit)?;
                if panel.is_empty() {
                    return Err(EngineError::EmptyNavPanel { portfolio_id });
                }
                // A fund without a panel column can never settle; flag it up
                // front rather than cancelling order after order.
                for fund_id in &fund_ids {
                    if !panel.contains_fund(fund_id) {
                        warn!(portfolio = %portfolio_id, fund = %fund_id, "fund has no NAV column");
                    }
                }
                Valuator::align_panel(&panel, calendar)
            };

            let fees = FeeCalculator::new(&config, self.provider.fund_fees(&fund_ids)?);
            let benchmark = match &registration.benchmark_id {
                Some(benchmark_id) => self.provider.benchmark_nav(benchmark_id, start, end)?,
                None => None,
            };

            runs.push(PortfolioRun::new(
                portfolio_id,
                config,
                fees,
                panel,
                schedule,
                benchmark,
            ));
        }
        Ok(runs)
    }

    fn step_day(
        &self,
        run: &mut PortfolioRun,
        calendar: &[NaiveDate],
        index: usize,
        day: NaiveDate,
        id_gen: &mut IdGen,
    ) {
        if run.config.setup_date.is_some_and(|setup| day < setup) {
            return;
        }

        run.portfolio.settle_pending_redeem(day);
        settle_due_orders(run, calendar, index, day);
        self.process_rebalances(run, calendar, index, day, id_gen);
        // Orders created above may settle today (zero-delay configs and
        // purchase legs).
        settle_due_orders(run, calendar, index, day);

        Valuator::mark_positions(&mut run.portfolio, &run.panel, index);
        accrue_management_fee(run, day);
        snapshot(run, day);
    }

    /// Execute purchase legs due today, then trigger every plan whose date
    /// has arrived. When several plans fall between two trading days only the
    /// latest target set still matters.
    fn process_rebalances(
        &self,
        run: &mut PortfolioRun,
        calendar: &[NaiveDate],
        index: usize,
        day: NaiveDate,
        id_gen: &mut IdGen,
    ) {
        let (due, later): (Vec<PurchaseLeg>, Vec<PurchaseLeg>) = run
            .purchase_legs
            .drain(..)
            .partition(|leg| leg.date <= day);
        run.purchase_legs = later;
        for leg in due {
            self.execute_purchase_leg(run, leg, day, id_gen);
        }

        while run.next_plan < run.schedule.len() && run.schedule[run.next_plan].date <= day {
            let plan = run.schedule[run.next_plan].clone();
            run.next_plan += 1;
            let superseded = run.next_plan < run.schedule.len()
                && run.schedule[run.next_plan].date <= day;
            if superseded {
                debug!(plan = %plan.id, date = %plan.date, "plan superseded before trigger");
                continue;
            }
            self.trigger_plan(run, plan, calendar, index, day, id_gen);
        }
    }

    fn trigger_plan(
        &self,
        run: &mut PortfolioRun,
        plan: RebalancePlan,
        calendar: &[NaiveDate],
        index: usize,
        day: NaiveDate,
        id_gen: &mut IdGen,
    ) {
        let buy_index = (index + run.config.rebalance_delay).min(calendar.len() - 1);
        let buy_date = calendar[buy_index];
        info!(
            portfolio = %run.portfolio.portfolio_id,
            plan = %plan.id,
            date = %plan.date,
            funds = plan.targets.len(),
            "rebalance triggered"
        );

        if !run.rebalanced {
            // Initial build-up: nothing to unwind, buy straight from cash.
            let candidates = self
                .executor
                .rebalance_candidates(&run.portfolio, &plan.targets);
            let candidates = self.executor.scale_to_cash(candidates, run.portfolio.cash);
            create_buy_orders(run, candidates, day, buy_date, Some(plan.id), id_gen);
        } else {
            // Redeem first; the purchase leg must not run before the
            // redemption proceeds are liquid (sell settles at
            // +effective_delay, its cash lands +redeem_settle_delay later).
            let sell_index =
                (index + run.config.rebalance_effective_delay).min(calendar.len() - 1);
            let candidates = self
                .executor
                .rebalance_candidates(&run.portfolio, &plan.targets);
            create_sell_orders(run, candidates, day, calendar[sell_index], plan.id, id_gen);

            let leg_offset = run.config.rebalance_delay.max(
                run.config.rebalance_effective_delay + run.config.redeem_settle_delay,
            );
            let leg_index = (index + leg_offset).min(calendar.len() - 1);
            let leg = PurchaseLeg {
                date: calendar[leg_index],
                rebalance_id: plan.id,
                targets: plan.targets,
            };
            if leg.date <= day {
                self.execute_purchase_leg(run, leg, day, id_gen);
            } else {
                run.purchase_legs.push(leg);
            }
        }
        run.rebalanced = true;
    }

    /// Size the buy side of a rebalance against current holdings, scale to
    /// whatever cash is available, and settle the orders the same day.
    fn execute_purchase_leg(
        &self,
        run: &mut PortfolioRun,
        leg: PurchaseLeg,
        day: NaiveDate,
        id_gen: &mut IdGen,
    ) {
        let buys: Vec<CandidateOrder> = self
            .executor
            .rebalance_candidates(&run.portfolio, &leg.targets)
            .into_iter()
            .filter(|candidate| candidate.side == OrderSide::Buy)
            .collect();
        let buys = self.executor.scale_to_cash(buys, run.portfolio.cash);
        create_buy_orders(run, buys, day, day, Some(leg.rebalance_id), id_gen);
    }
}

fn settle_due_orders(run: &mut PortfolioRun, calendar: &[NaiveDate], index: usize, day: NaiveDate) {
    let mut still_open = Vec::new();
    for mut order in std::mem::take(&mut run.open_orders) {
        if order.settle_date <= day {
            settle_order(
                &mut order,
                &mut run.portfolio,
                &run.fees,
                &run.panel,
                calendar,
                index,
                run.config.redeem_settle_delay,
            );
            run.trades.push(order);
        } else {
            still_open.push(order);
        }
    }
    run.open_orders = still_open;
}

fn create_buy_orders(
    run: &mut PortfolioRun,
    candidates: Vec<CandidateOrder>,
    day: NaiveDate,
    settle_date: NaiveDate,
    rebalance_id: Option<crate::domain::RebalanceId>,
    id_gen: &mut IdGen,
) {
    for candidate in candidates {
        let Some(amount) = candidate.amount else {
            continue;
        };
        if amount <= Decimal::ZERO {
            continue;
        }
        // The order carries the amount actually frozen, which may have been
        // clamped to available cash.
        match run.portfolio.freeze_cash(amount) {
            Some(frozen) if frozen > Decimal::ZERO => {
                let mut order = Order::buy(
                    id_gen.next_order_id(),
                    run.portfolio.portfolio_id.clone(),
                    candidate.fund_id,
                    frozen,
                    day,
                    settle_date,
                    rebalance_id,
                );
                order.freeze();
                run.open_orders.push(order);
            }
            _ => {
                warn!(
                    portfolio = %run.portfolio.portfolio_id,
                    fund = %candidate.fund_id,
                    %amount,
                    cash = %run.portfolio.cash,
                    "purchase skipped, insufficient cash"
                );
            }
        }
    }
}

fn create_sell_orders(
    run: &mut PortfolioRun,
    candidates: Vec<CandidateOrder>,
    day: NaiveDate,
    settle_date: NaiveDate,
    rebalance_id: crate::domain::RebalanceId,
    id_gen: &mut IdGen,
) {
    for candidate in candidates {
        if candidate.side != OrderSide::Sell {
            continue;
        }
        let Some(units) = candidate.units else {
            continue;
        };
        if units <= Decimal::ZERO {
            continue;
        }
        if !run.portfolio.freeze_units(&candidate.fund_id, units) {
            warn!(
                portfolio = %run.portfolio.portfolio_id,
                fund = %candidate.fund_id,
                %units,
                "redemption skipped, insufficient liquid units"
            );
            continue;
        }
        let mut order = Order::sell(
            id_gen.next_order_id(),
            run.portfolio.portfolio_id.clone(),
            candidate.fund_id,
            units,
            day,
            settle_date,
            Some(rebalance_id),
        );
        order.freeze();
        run.open_orders.push(order);
    }
}

/// Accrue the annualized management fee over the calendar days elapsed since
/// the last accrual. A cash shortfall skips the charge but the accrual clock
/// still advances.
fn accrue_management_fee(run: &mut PortfolioRun, day: NaiveDate) {
    let rate = run.config.management_fee_rate;
    if let Some(last) = run.last_fee_accrual {
        let elapsed = day.signed_duration_since(last).num_days();
        if elapsed > 0 && rate > Decimal::ZERO {
            let market_value = run.portfolio.market_value();
            let fee =
                round_cash(market_value * rate / DAYS_PER_YEAR * Decimal::from(elapsed));
            if fee > Decimal::ZERO {
                if run.portfolio.cash >= fee {
                    run.portfolio.cash = round_cash(run.portfolio.cash - fee);
                    debug!(portfolio = %run.portfolio.portfolio_id, %fee, "management fee charged");
                } else {
                    warn!(
                        portfolio = %run.portfolio.portfolio_id,
                        %fee,
                        cash = %run.portfolio.cash,
                        "management fee skipped, insufficient cash"
                    );
                }
            }
        }
    }
    run.last_fee_accrual = Some(day);
}

fn snapshot(run: &mut PortfolioRun, day: NaiveDate) {
    let market_value = run.portfolio.market_value();
    let unit_nav = Valuator::unit_nav(market_value, run.config.initial_cash);
    run.nav_series.push(NavPoint {
        date: day,
        market_value,
        unit_nav,
    });
    for (fund_id, position) in &run.portfolio.positions {
        run.holdings.push(HoldingRecord {
            date: day,
            portfolio_id: run.portfolio.portfolio_id.clone(),
            fund_id: fund_id.clone(),
            units: position.units,
            frozen_units: position.frozen_units,
            nav: position.nav,
            cost: position.cost,
            market_value: position.market_value(),
        });
    }

    #[cfg(debug_assertions)]
    {
        assert!(!run.portfolio.cash.is_sign_negative(), "negative cash");
        assert!(
            !run.portfolio.frozen_cash.is_sign_negative(),
            "negative frozen cash"
        );
        for position in run.portfolio.positions.values() {
            assert!(!position.units.is_sign_negative(), "negative units");
            assert!(
                !position.frozen_units.is_sign_negative(),
                "negative frozen units"
            );
        }
    }
}
