pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod traits;
pub mod types;

pub use config::{DisputeConfig, EngineConfig, OddsConfig, SweepConfig};
pub use config_loader::ConfigLoader;
pub use error::{EngineError, ErrorKind, Result};
pub use events::TransitionEvent;
pub use traits::{BetRepository, SaveOutcome, SettlementLedger};
pub use types::{
    stake_on, total_pot, Bet, BetId, BetStatus, Dispute, DisputeId, DisputeReason, DisputeStatus,
    NewBet, Outcome, Participant, ParticipantId, PayoutEntry, Side, UserId,
};
