//! Expiration sweep.
//!
//! Bets still open (ACTIVE or LIVE) once their deadline passes either move to
//! PENDING_RESOLUTION, when someone joined, or are voided to CANCELLED. The
//! decision reads the current status first, so evaluating a bet that has
//! already moved on is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wager_core::{Bet, BetStatus, TransitionEvent};

/// What the sweep should do with one bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepAction {
    /// Not open, or deadline not reached.
    Skip,
    /// Deadline passed with participants.
    ToPending,
    /// Deadline passed with nobody joined.
    ToCancelled,
}

impl SweepAction {
    /// Target status, if the bet moves.
    #[must_use]
    pub fn target(self) -> Option<BetStatus> {
        match self {
            Self::Skip => None,
            Self::ToPending => Some(BetStatus::PendingResolution),
            Self::ToCancelled => Some(BetStatus::Cancelled),
        }
    }
}

/// Decides the sweep action for a bet.
#[must_use]
pub fn evaluate(bet: &Bet, participant_count: usize, now: DateTime<Utc>) -> SweepAction {
    if !bet.status.accepts_joins() || !bet.is_expired(now) {
        return SweepAction::Skip;
    }
    if participant_count > 0 {
        SweepAction::ToPending
    } else {
        SweepAction::ToCancelled
    }
}

/// Tally of one sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Candidates looked at.
    pub examined: usize,
    /// Moved to PENDING_RESOLUTION.
    pub moved_to_pending: usize,
    /// Voided to CANCELLED.
    pub cancelled: usize,
    /// Already moved on, or not yet due.
    pub skipped: usize,
    /// Lost a concurrent write; picked up again next run.
    pub conflicts: usize,
    /// Failed for any other reason.
    pub failed: usize,
    /// Transitions applied in this run.
    pub events: Vec<TransitionEvent>,
}

impl SweepReport {
    /// Number of bets that changed status.
    #[must_use]
    pub fn transitioned(&self) -> usize {
        self.moved_to_pending + self.cancelled
    }

    pub(crate) fn record(&mut self, event: TransitionEvent) {
        match event.to {
            BetStatus::PendingResolution => self.moved_to_pending += 1,
            BetStatus::Cancelled => self.cancelled += 1,
            _ => {}
        }
        self.events.push(event);
    }
}
