use crate::error::Result;
use crate::types::{Bet, BetId, BetStatus, Dispute, Participant, PayoutEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Result of a guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The stored status no longer matched the expected one.
    Conflict { current: Option<BetStatus> },
}

/// Persistence collaborator.
///
/// Writes are compare-and-swap on bet status: `expected = Some(s)` persists
/// only if the stored bet is still in `s`; `expected = None` inserts a bet
/// that must not exist yet.
#[async_trait]
pub trait BetRepository: Send + Sync {
    async fn load_bet(&self, id: BetId) -> Result<Bet>;

    async fn load_participants(&self, bet_id: BetId) -> Result<Vec<Participant>>;

    /// Writes the bet alone; participants are left untouched.
    async fn save_bet(&self, bet: &Bet, expected: Option<BetStatus>) -> Result<SaveOutcome>;

    /// Appends one participant while the bet is still in `expected`.
    ///
    /// Fails with `DuplicateParticipant` if the user already holds a stake.
    async fn add_participant(
        &self,
        participant: &Participant,
        expected: BetStatus,
    ) -> Result<SaveOutcome>;

    async fn save_bet_and_participants(
        &self,
        bet: &Bet,
        participants: &[Participant],
        expected: Option<BetStatus>,
    ) -> Result<SaveOutcome>;

    async fn load_disputes(&self, bet_id: BetId) -> Result<Vec<Dispute>>;

    /// Writes the dispute together with the bet and its participants.
    async fn save_dispute(
        &self,
        bet: &Bet,
        participants: &[Participant],
        dispute: &Dispute,
        expected: BetStatus,
    ) -> Result<SaveOutcome>;

    /// Bets in ACTIVE or LIVE whose deadline is at or before `now`.
    async fn list_sweep_candidates(&self, now: DateTime<Utc>) -> Result<Vec<BetId>>;
}

/// Settlement ledger collaborator holding the "payouts released" flag.
#[async_trait]
pub trait SettlementLedger: Send + Sync {
    async fn is_released(&self, bet_id: BetId) -> Result<bool>;

    /// Replaces any previous entries for the bet and marks them released.
    async fn release(&self, bet_id: BetId, entries: &[PayoutEntry]) -> Result<()>;

    /// Marks the bet's payouts as held.
    async fn hold(&self, bet_id: BetId) -> Result<()>;
}
