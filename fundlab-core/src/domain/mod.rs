//! Domain types for the settlement simulator.

pub mod config;
pub mod ids;
pub mod money;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod rebalance;

pub use config::{
    PortfolioConfig, DEFAULT_FREEZE_TOLERANCE, DEFAULT_PURCHASE_FEE_RATE, DEFAULT_REDEEM_FEE_RATE,
};
pub use ids::{IdGen, OrderId, RebalanceId};
pub use money::{round_cash, round_cost, round_units};
pub use order::{Order, OrderSide, OrderStatus};
pub use portfolio::{PendingRedeem, Portfolio};
pub use position::Position;
pub use rebalance::{
    build_schedule, normalize_weights, RebalancePlan, RebalanceRecord, TargetWeight, WeightError,
};
