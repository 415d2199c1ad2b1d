//! Domain types shared across the settlement engine.
//!
//! Money is [`Decimal`], timestamps are UTC, identities of bets, participants
//! and disputes are [`Uuid`]s. User identities belong to the auth
//! collaborator and are carried as opaque strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EngineError;

pub type BetId = Uuid;
pub type ParticipantId = Uuid;
pub type DisputeId = Uuid;
pub type UserId = String;

// =============================================================================
// Sides and Outcomes
// =============================================================================

/// One of the two sides of a proposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    /// Returns the opposing side.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Side {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            _ => Err(EngineError::UnknownSide(s.to_string())),
        }
    }
}

/// How a bet was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// One side won the pot.
    Winner(Side),
    /// Void: nobody wins, every stake is refunded.
    NoContest,
}

impl Outcome {
    /// Returns the winning side, if any.
    #[must_use]
    pub fn winning_side(self) -> Option<Side> {
        match self {
            Self::Winner(side) => Some(side),
            Self::NoContest => None,
        }
    }

    /// Returns true if a stake on `side` wins under this outcome.
    #[must_use]
    pub fn side_wins(self, side: Side) -> bool {
        self.winning_side() == Some(side)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Winner(side) => write!(f, "{side}"),
            Self::NoContest => write!(f, "no_contest"),
        }
    }
}

impl FromStr for Outcome {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "void" | "no_contest" | "no-contest" => Ok(Self::NoContest),
            _ => s.parse::<Side>().map(Self::Winner),
        }
    }
}

// =============================================================================
// Bet Status
// =============================================================================

/// Lifecycle status of a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetStatus {
    Draft,
    Active,
    Live,
    PendingResolution,
    Disputed,
    Resolved,
    Cancelled,
}

impl BetStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Live => "LIVE",
            Self::PendingResolution => "PENDING_RESOLUTION",
            Self::Disputed => "DISPUTED",
            Self::Resolved => "RESOLVED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// RESOLVED and CANCELLED are terminal. RESOLVED may still be reopened
    /// by the dispute path, see [`BetStatus::can_transition_to`].
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }

    /// Statuses in which new participants may join.
    #[must_use]
    pub fn accepts_joins(self) -> bool {
        matches!(self, Self::Active | Self::Live)
    }

    /// The complete transition table.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        use BetStatus::*;
        matches!(
            (self, to),
            (Draft, Active)
                | (Active, Live)
                | (Active | Live, PendingResolution)
                | (Active | Live, Cancelled)
                | (PendingResolution, Resolved)
                | (Resolved, Disputed)
                | (Disputed, Resolved)
                | (Disputed, PendingResolution)
        )
    }
}

impl std::fmt::Display for BetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Bet
// =============================================================================

/// Request to create a bet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBet {
    pub title: String,
    pub description: String,
    pub category: String,
    pub creator_id: UserId,
    /// Resolver other than the creator, if one was designated.
    pub resolver_id: Option<UserId>,
    pub side_a_name: String,
    pub side_b_name: String,
    pub deadline: DateTime<Utc>,
    /// Skip DRAFT and open the bet immediately.
    pub publish: bool,
}

/// A proposition with two named sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: BetStatus,
    pub creator_id: UserId,
    pub resolver_id: Option<UserId>,
    pub side_a_name: String,
    pub side_b_name: String,
    /// No joins after this instant; the sweep picks the bet up once it passes.
    pub deadline: DateTime<Utc>,
    pub winning_side: Option<Outcome>,
    pub resolution_reason: Option<String>,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bet {
    /// Display name of a side.
    #[must_use]
    pub fn side_name(&self, side: Side) -> &str {
        match side {
            Side::A => &self.side_a_name,
            Side::B => &self.side_b_name,
        }
    }

    /// The creator may always resolve; a designated resolver may as well.
    #[must_use]
    pub fn is_authorized_resolver(&self, user_id: &str) -> bool {
        self.creator_id == user_id || self.resolver_id.as_deref() == Some(user_id)
    }

    /// Whether the deadline has passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }

    /// Identity that answers disputes: whoever resolved, else the creator.
    #[must_use]
    pub fn respondent(&self) -> &str {
        self.resolved_by.as_deref().unwrap_or(&self.creator_id)
    }
}

// =============================================================================
// Participant
// =============================================================================

/// One user's stake on one side of one bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub bet_id: BetId,
    pub user_id: UserId,
    pub side: Side,
    pub stake: Decimal,
    /// Zero until the bet resolves.
    pub payout: Decimal,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    #[must_use]
    pub fn new(
        bet_id: BetId,
        user_id: impl Into<UserId>,
        side: Side,
        stake: Decimal,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            bet_id,
            user_id: user_id.into(),
            side,
            stake,
            payout: Decimal::ZERO,
            joined_at,
        }
    }
}

/// Sum of all stakes.
#[must_use]
pub fn total_pot(participants: &[Participant]) -> Decimal {
    participants.iter().map(|p| p.stake).sum()
}

/// Sum of stakes on one side.
#[must_use]
pub fn stake_on(participants: &[Participant], side: Side) -> Decimal {
    participants
        .iter()
        .filter(|p| p.side == side)
        .map(|p| p.stake)
        .sum()
}

/// Ledger record for one participant's payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutEntry {
    pub bet_id: BetId,
    pub participant_id: ParticipantId,
    pub user_id: UserId,
    pub amount: Decimal,
}

impl PayoutEntry {
    /// Entries for every participant with a non-zero payout.
    #[must_use]
    pub fn from_participants(participants: &[Participant]) -> Vec<Self> {
        participants
            .iter()
            .filter(|p| !p.payout.is_zero())
            .map(|p| Self {
                bet_id: p.bet_id,
                participant_id: p.id,
                user_id: p.user_id.clone(),
                amount: p.payout,
            })
            .collect()
    }
}

// =============================================================================
// Dispute
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeReason {
    IncorrectOutcome,
    PrematureResolution,
    EventCancelled,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    Open,
    Upheld,
    Rejected,
}

/// A claim against a resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub bet_id: BetId,
    pub filer_id: UserId,
    pub respondent_id: UserId,
    pub reason: DisputeReason,
    pub description: String,
    pub filed_at: DateTime<Utc>,
    pub status: DisputeStatus,
    pub adjudicated_at: Option<DateTime<Utc>>,
    pub adjudicated_by: Option<UserId>,
}
