//! Error taxonomy for the settlement engine.
//!
//! Every failure is a value returned to the caller. [`EngineError::kind`]
//! groups variants into validation, state, conflict and collaborator
//! failures; [`EngineError::code`] is a stable reason code for callers that
//! map errors to user-facing messages.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{BetId, BetStatus, DisputeId, ParticipantId, Side, UserId};

/// Broad category of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, rejected before any state is touched.
    Validation,
    /// The request does not fit the bet's current state.
    State,
    /// Lost a compare-and-swap; safe to retry.
    Conflict,
    /// A collaborator (repository, ledger) failed or had no record.
    Collaborator,
}

/// Errors produced by the settlement engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    // ==================== Validation ====================
    /// Stake was zero or negative.
    #[error("stake must be positive, got {stake}")]
    NonPositiveStake {
        /// The offending stake.
        stake: Decimal,
    },

    /// Stake has more decimal places than currency minor units allow.
    #[error("stake {stake} has more than {max_decimals} decimal places")]
    StakeTooPrecise {
        /// The offending stake.
        stake: Decimal,
        /// Allowed decimal places.
        max_decimals: u32,
    },

    /// Side identifier is not one of the two sides.
    #[error("unknown side identifier: {0}")]
    UnknownSide(String),

    /// A side has no display name.
    #[error("side {side} must have a name")]
    EmptySideName {
        /// The unnamed side.
        side: Side,
    },

    /// Bet title is blank.
    #[error("bet title must not be empty")]
    EmptyTitle,

    /// Deadline is not in the future.
    #[error("deadline {deadline} is not in the future")]
    DeadlineInPast {
        /// The rejected deadline.
        deadline: DateTime<Utc>,
    },

    /// User already holds a stake on this bet.
    #[error("user {user_id} already joined bet {bet_id}")]
    DuplicateParticipant {
        /// Bet being joined.
        bet_id: BetId,
        /// User attempting to join twice.
        user_id: UserId,
    },

    /// Participant record belongs to a different bet.
    #[error("participant {participant_id} does not belong to bet {bet_id}")]
    ForeignParticipant {
        /// Bet being settled.
        bet_id: BetId,
        /// The stray participant.
        participant_id: ParticipantId,
    },

    /// Odds input or quote parameters rejected.
    #[error("invalid odds: {0}")]
    InvalidOdds(String),

    /// Engine configuration rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ==================== State ====================
    /// Transition not in the lifecycle table.
    #[error("bet {bet_id}: invalid transition {from} -> {to}")]
    InvalidTransition {
        /// Bet being transitioned.
        bet_id: BetId,
        /// Current status.
        from: BetStatus,
        /// Requested status.
        to: BetStatus,
    },

    /// Bet no longer accepts joins.
    #[error("bet {bet_id} is closed to new participants ({status})")]
    JoinClosed {
        /// The closed bet.
        bet_id: BetId,
        /// Its status at the time of the request.
        status: BetStatus,
    },

    /// Joining after the deadline.
    #[error("bet {bet_id} deadline {deadline} has passed")]
    DeadlinePassed {
        /// The expired bet.
        bet_id: BetId,
        /// Its deadline.
        deadline: DateTime<Utc>,
    },

    /// Actor may not perform this action.
    #[error("user {user_id} is not allowed to {action} bet {bet_id}")]
    Unauthorized {
        /// Target bet.
        bet_id: BetId,
        /// Acting user.
        user_id: UserId,
        /// Attempted action.
        action: &'static str,
    },

    /// Creator cancellation after someone joined.
    #[error("bet {bet_id} has {count} participants and cannot be cancelled")]
    ParticipantsExist {
        /// Target bet.
        bet_id: BetId,
        /// Number of participants.
        count: usize,
    },

    /// Dispute filed against a bet that is not resolved.
    #[error("bet {bet_id} is {status}, disputes require RESOLVED")]
    NotResolved {
        /// Target bet.
        bet_id: BetId,
        /// Its status.
        status: BetStatus,
    },

    /// Resolver disputing their own resolution.
    #[error("user {user_id} resolved bet {bet_id} and cannot dispute it")]
    SelfDispute {
        /// Target bet.
        bet_id: BetId,
        /// The resolver.
        user_id: UserId,
    },

    /// Dispute filed after the window closed.
    #[error("dispute window for bet {bet_id} closed at {closed_at}")]
    DisputeWindowClosed {
        /// Target bet.
        bet_id: BetId,
        /// End of the window.
        closed_at: DateTime<Utc>,
    },

    /// A dispute is already open.
    #[error("bet {bet_id} already has open dispute {dispute_id}")]
    DisputeAlreadyOpen {
        /// Target bet.
        bet_id: BetId,
        /// The open dispute.
        dispute_id: DisputeId,
    },

    /// Refiling after a rejected dispute is disabled.
    #[error("a dispute against the current resolution of bet {bet_id} was already rejected")]
    RefilingNotAllowed {
        /// Target bet.
        bet_id: BetId,
    },

    /// Dispute already adjudicated.
    #[error("dispute {dispute_id} is not open")]
    DisputeNotOpen {
        /// The closed dispute.
        dispute_id: DisputeId,
    },

    /// Ledger reports payouts were released while they should be held.
    #[error("payouts for bet {bet_id} were already released")]
    PayoutsAlreadyReleased {
        /// Target bet.
        bet_id: BetId,
    },

    // ==================== Conflict ====================
    /// Stored status changed between load and save.
    #[error("bet {bet_id} changed concurrently (expected {expected})")]
    Conflict {
        /// Target bet.
        bet_id: BetId,
        /// Status the write was guarded on.
        expected: BetStatus,
    },

    // ==================== Collaborator ====================
    /// No bet with this id.
    #[error("bet not found: {bet_id}")]
    BetNotFound {
        /// Missing bet.
        bet_id: BetId,
    },

    /// No dispute with this id.
    #[error("dispute not found: {dispute_id}")]
    DisputeNotFound {
        /// Missing dispute.
        dispute_id: DisputeId,
    },

    /// Status change committed but the ledger release failed.
    #[error("bet {bet_id} committed but payout release is pending: {reason}")]
    ReleasePending {
        /// Target bet.
        bet_id: BetId,
        /// Ledger failure.
        reason: String,
    },

    /// Repository or ledger failure.
    #[error("collaborator error: {0}")]
    Collaborator(String),
}

impl EngineError {
    /// Creates an invalid transition error.
    pub fn invalid_transition(bet_id: BetId, from: BetStatus, to: BetStatus) -> Self {
        Self::InvalidTransition { bet_id, from, to }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(bet_id: BetId, user_id: impl Into<UserId>, action: &'static str) -> Self {
        Self::Unauthorized {
            bet_id,
            user_id: user_id.into(),
            action,
        }
    }

    /// Creates a conflict error.
    pub fn conflict(bet_id: BetId, expected: BetStatus) -> Self {
        Self::Conflict { bet_id, expected }
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NonPositiveStake { .. }
            | Self::UnknownSide(_)
            | Self::EmptySideName { .. }
            | Self::EmptyTitle
            | Self::DeadlineInPast { .. }
            | Self::DuplicateParticipant { .. }
            | Self::ForeignParticipant { .. }
            | Self::InvalidOdds(_)
            | Self::StakeTooPrecise { .. }
            | Self::InvalidConfig(_) => ErrorKind::Validation,
            Self::InvalidTransition { .. }
            | Self::JoinClosed { .. }
            | Self::DeadlinePassed { .. }
            | Self::Unauthorized { .. }
            | Self::ParticipantsExist { .. }
            | Self::NotResolved { .. }
            | Self::SelfDispute { .. }
            | Self::DisputeWindowClosed { .. }
            | Self::DisputeAlreadyOpen { .. }
            | Self::RefilingNotAllowed { .. }
            | Self::DisputeNotOpen { .. }
            | Self::PayoutsAlreadyReleased { .. } => ErrorKind::State,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::BetNotFound { .. }
            | Self::DisputeNotFound { .. }
            | Self::ReleasePending { .. }
            | Self::Collaborator(_) => ErrorKind::Collaborator,
        }
    }

    /// Stable reason code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NonPositiveStake { .. } => "non_positive_stake",
            Self::UnknownSide(_) => "unknown_side",
            Self::EmptySideName { .. } => "empty_side_name",
            Self::EmptyTitle => "empty_title",
            Self::DeadlineInPast { .. } => "deadline_in_past",
            Self::DuplicateParticipant { .. } => "duplicate_participant",
            Self::ForeignParticipant { .. } => "foreign_participant",
            Self::InvalidOdds(_) => "invalid_odds",
            Self::StakeTooPrecise { .. } => "stake_too_precise",
            Self::InvalidConfig(_) => "invalid_config",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::JoinClosed { .. } => "join_closed",
            Self::DeadlinePassed { .. } => "deadline_passed",
            Self::Unauthorized { .. } => "unauthorized",
            Self::ParticipantsExist { .. } => "participants_exist",
            Self::NotResolved { .. } => "not_resolved",
            Self::SelfDispute { .. } => "self_dispute",
            Self::DisputeWindowClosed { .. } => "dispute_window_closed",
            Self::DisputeAlreadyOpen { .. } => "dispute_already_open",
            Self::RefilingNotAllowed { .. } => "refiling_not_allowed",
            Self::DisputeNotOpen { .. } => "dispute_not_open",
            Self::PayoutsAlreadyReleased { .. } => "payouts_already_released",
            Self::Conflict { .. } => "conflict",
            Self::BetNotFound { .. } => "bet_not_found",
            Self::DisputeNotFound { .. } => "dispute_not_found",
            Self::ReleasePending { .. } => "release_pending",
            Self::Collaborator(_) => "collaborator",
        }
    }

    /// Returns true if the failure is transient.
    ///
    /// A `Conflict` is retried by repeating the request; a `ReleasePending`
    /// by retrying the ledger release alone.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::ReleasePending { .. })
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
