//! Bet settlement engine.
//!
//! - [`payout`]: pari-mutuel distribution with exact-sum rounding
//! - [`lifecycle`]: status state machine for a single bet
//! - [`sweep`]: expiration decisions for bets past their deadline
//! - [`dispute`]: dispute filing and adjudication
//! - [`service`]: async orchestration over repository and ledger traits
//! - [`memory`]: in-memory collaborators
//! - [`sweeper`]: periodic sweep task

pub mod dispute;
pub mod lifecycle;
pub mod memory;
pub mod payout;
pub mod service;
pub mod sweep;
pub mod sweeper;

pub use dispute::{Adjudication, DisputeGate, FiledDispute};
pub use lifecycle::{BetLifecycle, Resolution, Transition};
pub use memory::{InMemoryBetStore, LedgerRecord};
pub use payout::{Distribution, PayoutDistributor, PAYOUT_DECIMALS};
pub use service::{SettlementService, EVENT_CHANNEL_CAPACITY};
pub use sweep::{SweepAction, SweepReport};
