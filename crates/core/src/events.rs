use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BetId, BetStatus};

/// Emitted for every successful lifecycle transition.
///
/// Notification collaborators subscribe to these; the engine never delivers
/// notifications itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub bet_id: BetId,
    pub from: BetStatus,
    pub to: BetStatus,
    pub timestamp: DateTime<Utc>,
}

impl TransitionEvent {
    #[must_use]
    pub fn new(bet_id: BetId, from: BetStatus, to: BetStatus, timestamp: DateTime<Utc>) -> Self {
        Self {
            bet_id,
            from,
            to,
            timestamp,
        }
    }
}

impl std::fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} -> {} at {}",
            self.bet_id,
            self.from,
            self.to,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}
