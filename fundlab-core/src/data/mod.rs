//! Data boundary: the DataProvider trait, the NAV panel, and the in-memory
//! reference implementation.

pub mod memory;
pub mod panel;
pub mod provider;

pub use memory::MemoryProvider;
pub use panel::NavPanel;
pub use provider::{
    CalendarKind, DataError, DataProvider, FundFee, NavSeries, NavType,
};
