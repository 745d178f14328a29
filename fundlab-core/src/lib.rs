//! FundLab Core — discrete-time fund portfolio settlement simulator.
//!
//! Feed it a trading calendar, a daily NAV panel, and a schedule of
//! target-weight rebalances; it simulates subscriptions and redemptions with
//! T+N settlement, transaction and management fees, and daily valuation, and
//! returns a NAV series plus a full audit trail of orders and holdings:
//! - Domain types (orders, positions, portfolio, rebalance plans)
//! - Data boundary (`DataProvider` trait, NAV panel, in-memory provider)
//! - Engine (daily loop, settlement, fee lookup, rebalance sizing, valuation)

pub mod data;
pub mod domain;
pub mod engine;
