//! CLI commands for the settlement engine.

pub mod odds;
pub mod quote;
pub mod settle;
pub mod simulate;

pub use odds::{run_odds, OddsCommand};
pub use quote::{run_quote, QuoteArgs};
pub use settle::{run_settle, SettleArgs};
pub use simulate::{run_simulate, SimulateArgs};
