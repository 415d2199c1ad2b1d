//! In-memory repository and ledger.
//!
//! Backs the CLI simulation and tests. All state sits behind one lock so a
//! status check and the write it guards happen atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use wager_core::{
    Bet, BetId, BetRepository, BetStatus, Dispute, EngineError, Participant, PayoutEntry, Result,
    SaveOutcome, SettlementLedger,
};

/// Ledger state for one bet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerRecord {
    pub released: bool,
    pub entries: Vec<PayoutEntry>,
    /// Times `release` was called; a double payout shows up here.
    pub release_count: u32,
}

#[derive(Debug, Default)]
struct StoreState {
    bets: HashMap<BetId, Bet>,
    participants: HashMap<BetId, Vec<Participant>>,
    disputes: HashMap<BetId, Vec<Dispute>>,
    ledger: HashMap<BetId, LedgerRecord>,
}

impl StoreState {
    /// Compare-and-swap guard on the stored status.
    fn guard(&self, bet_id: BetId, expected: Option<BetStatus>) -> Option<SaveOutcome> {
        let current = self.bets.get(&bet_id).map(|b| b.status);
        if current == expected {
            None
        } else {
            Some(SaveOutcome::Conflict { current })
        }
    }
}

/// Thread-safe in-memory implementation of [`BetRepository`] and
/// [`SettlementLedger`].
#[derive(Debug, Default)]
pub struct InMemoryBetStore {
    state: RwLock<StoreState>,
}

impl InMemoryBetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger state for a bet; `None` if the ledger never saw it.
    #[must_use]
    pub fn ledger_record(&self, bet_id: BetId) -> Option<LedgerRecord> {
        self.state.read().ledger.get(&bet_id).cloned()
    }

    /// Number of bets stored.
    #[must_use]
    pub fn bet_count(&self) -> usize {
        self.state.read().bets.len()
    }
}

#[async_trait]
impl BetRepository for InMemoryBetStore {
    async fn load_bet(&self, id: BetId) -> Result<Bet> {
        self.state
            .read()
            .bets
            .get(&id)
            .cloned()
            .ok_or(EngineError::BetNotFound { bet_id: id })
    }

    async fn load_participants(&self, bet_id: BetId) -> Result<Vec<Participant>> {
        Ok(self
            .state
            .read()
            .participants
            .get(&bet_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_bet(&self, bet: &Bet, expected: Option<BetStatus>) -> Result<SaveOutcome> {
        let mut state = self.state.write();
        if let Some(conflict) = state.guard(bet.id, expected) {
            return Ok(conflict);
        }
        state.bets.insert(bet.id, bet.clone());
        Ok(SaveOutcome::Saved)
    }

    async fn add_participant(
        &self,
        participant: &Participant,
        expected: BetStatus,
    ) -> Result<SaveOutcome> {
        let mut state = self.state.write();
        if let Some(conflict) = state.guard(participant.bet_id, Some(expected)) {
            return Ok(conflict);
        }
        let joined = state.participants.entry(participant.bet_id).or_default();
        if joined.iter().any(|p| p.user_id == participant.user_id) {
            return Err(EngineError::DuplicateParticipant {
                bet_id: participant.bet_id,
                user_id: participant.user_id.clone(),
            });
        }
        joined.push(participant.clone());
        Ok(SaveOutcome::Saved)
    }

    async fn save_bet_and_participants(
        &self,
        bet: &Bet,
        participants: &[Participant],
        expected: Option<BetStatus>,
    ) -> Result<SaveOutcome> {
        let mut state = self.state.write();
        if let Some(conflict) = state.guard(bet.id, expected) {
            return Ok(conflict);
        }
        state.bets.insert(bet.id, bet.clone());
        state.participants.insert(bet.id, participants.to_vec());
        Ok(SaveOutcome::Saved)
    }

    async fn load_disputes(&self, bet_id: BetId) -> Result<Vec<Dispute>> {
        Ok(self
            .state
            .read()
            .disputes
            .get(&bet_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_dispute(
        &self,
        bet: &Bet,
        participants: &[Participant],
        dispute: &Dispute,
        expected: BetStatus,
    ) -> Result<SaveOutcome> {
        let mut state = self.state.write();
        if let Some(conflict) = state.guard(bet.id, Some(expected)) {
            return Ok(conflict);
        }
        state.bets.insert(bet.id, bet.clone());
        state.participants.insert(bet.id, participants.to_vec());

        let disputes = state.disputes.entry(bet.id).or_default();
        match disputes.iter_mut().find(|d| d.id == dispute.id) {
            Some(existing) => *existing = dispute.clone(),
            None => disputes.push(dispute.clone()),
        }
        Ok(SaveOutcome::Saved)
    }

    async fn list_sweep_candidates(&self, now: DateTime<Utc>) -> Result<Vec<BetId>> {
        let state = self.state.read();
        let mut due: Vec<&Bet> = state
            .bets
            .values()
            .filter(|b| b.status.accepts_joins() && b.is_expired(now))
            .collect();
        due.sort_by_key(|b| (b.deadline, b.id));
        Ok(due.into_iter().map(|b| b.id).collect())
    }
}

#[async_trait]
impl SettlementLedger for InMemoryBetStore {
    async fn is_released(&self, bet_id: BetId) -> Result<bool> {
        Ok(self
            .state
            .read()
            .ledger
            .get(&bet_id)
            .is_some_and(|r| r.released))
    }

    async fn release(&self, bet_id: BetId, entries: &[PayoutEntry]) -> Result<()> {
        let mut state = self.state.write();
        let record = state.ledger.entry(bet_id).or_default();
        record.released = true;
        record.entries = entries.to_vec();
        record.release_count += 1;
        Ok(())
    }

    async fn hold(&self, bet_id: BetId) -> Result<()> {
        self.state.write().ledger.entry(bet_id).or_default().released = false;
        Ok(())
    }
}
