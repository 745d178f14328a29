//! Simulation engine: the daily loop plus its collaborators for fee lookup,
//! rebalance sizing, settlement, and valuation.

pub mod executor;
pub mod fees;
pub mod loop_runner;
pub mod settlement;
pub mod state;
pub mod valuation;

pub use executor::{CandidateOrder, TradeExecutor, DEFAULT_DEAD_BAND};
pub use fees::FeeCalculator;
pub use loop_runner::{BacktestEngine, EngineError, Registration};
pub use settlement::{settle_order, SettlementOutcome};
pub use state::{compute_returns, BacktestResult, HoldingRecord, NavPoint, PortfolioRun};
pub use valuation::Valuator;
