//! Async orchestration over the repository and ledger collaborators.
//!
//! Each operation loads current state, runs the pure lifecycle or dispute
//! step, and persists the result behind a status guard. A guard that no
//! longer matches surfaces as the retryable [`EngineError::Conflict`].
//! Successful transitions are logged and broadcast to subscribers.
//!
//! The store and the ledger are never left disagreeing silently.
//! Payouts are held before a dispute is recorded, and the hold is undone if
//! the record fails. A release that fails after its transition committed is
//! reported as [`EngineError::ReleasePending`] and finished with
//! [`SettlementService::retry_release`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use wager_core::{
    stake_on, Bet, BetId, BetRepository, BetStatus, Dispute, DisputeId, DisputeReason,
    EngineConfig, EngineError, NewBet, Outcome, Participant, PayoutEntry, Result, SaveOutcome,
    SettlementLedger, Side, TransitionEvent,
};
use wager_odds::{DynamicOddsCalculator, OddsQuote};

use crate::dispute::DisputeGate;
use crate::lifecycle::{BetLifecycle, Resolution, Transition};
use crate::payout::PayoutDistributor;
use crate::sweep::SweepReport;

/// Buffered transition events per subscriber before the slowest lags.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct SettlementService<R, L> {
    repo: Arc<R>,
    ledger: Arc<L>,
    lifecycle: BetLifecycle,
    gate: DisputeGate,
    odds: DynamicOddsCalculator,
    events: broadcast::Sender<TransitionEvent>,
}

impl<R, L> SettlementService<R, L>
where
    R: BetRepository,
    L: SettlementLedger,
{
    /// Builds the service from injected collaborators and configuration.
    ///
    /// # Errors
    /// Returns `InvalidOdds` if the odds configuration is rejected and
    /// `InvalidConfig` if the dispute window is out of range.
    pub fn new(repo: Arc<R>, ledger: Arc<L>, config: &EngineConfig) -> Result<Self> {
        let odds = DynamicOddsCalculator::new(config.odds.vig, config.odds.default_american)
            .map_err(|e| EngineError::InvalidOdds(e.to_string()))?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            repo,
            ledger,
            lifecycle: BetLifecycle::new(PayoutDistributor::new()),
            gate: DisputeGate::new(config.dispute.clone())?,
            odds,
            events,
        })
    }

    /// Subscribes to transition events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.events.subscribe()
    }

    pub async fn bet(&self, bet_id: BetId) -> Result<Bet> {
        self.repo.load_bet(bet_id).await
    }

    pub async fn participants(&self, bet_id: BetId) -> Result<Vec<Participant>> {
        self.repo.load_participants(bet_id).await
    }

    pub async fn disputes(&self, bet_id: BetId) -> Result<Vec<Dispute>> {
        self.repo.load_disputes(bet_id).await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub async fn create_bet(&self, new_bet: NewBet, now: DateTime<Utc>) -> Result<Bet> {
        let bet = self.lifecycle.create(new_bet, now)?;
        match self.repo.save_bet(&bet, None).await? {
            SaveOutcome::Saved => {}
            SaveOutcome::Conflict { .. } => {
                return Err(EngineError::Collaborator(format!(
                    "bet {} already exists",
                    bet.id
                )))
            }
        }
        info!(bet_id = %bet.id, status = %bet.status, creator = %bet.creator_id, "Bet created");
        Ok(bet)
    }

    pub async fn publish(&self, bet_id: BetId, actor: &str, now: DateTime<Utc>) -> Result<Bet> {
        let bet = self.repo.load_bet(bet_id).await?;
        let transition = self.lifecycle.publish(&bet, actor, now)?;
        self.commit(transition, bet.status).await
    }

    pub async fn start_live(&self, bet_id: BetId, now: DateTime<Utc>) -> Result<Bet> {
        let bet = self.repo.load_bet(bet_id).await?;
        let transition = self.lifecycle.start_live(&bet, now)?;
        self.commit(transition, bet.status).await
    }

    pub async fn join(
        &self,
        bet_id: BetId,
        user_id: &str,
        side: Side,
        stake: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Participant> {
        let bet = self.repo.load_bet(bet_id).await?;
        let existing = self.repo.load_participants(bet_id).await?;
        let participant = self
            .lifecycle
            .join(&bet, &existing, user_id, side, stake, now)?;

        let outcome = self.repo.add_participant(&participant, bet.status).await?;
        check_saved(outcome, bet_id, bet.status)?;

        info!(bet_id = %bet_id, user_id, %side, %stake, "Participant joined");
        Ok(participant)
    }

    pub async fn cancel(&self, bet_id: BetId, actor: &str, now: DateTime<Utc>) -> Result<Bet> {
        let bet = self.repo.load_bet(bet_id).await?;
        let count = self.repo.load_participants(bet_id).await?.len();
        let transition = self.lifecycle.cancel(&bet, actor, count, now)?;
        self.commit(transition, bet.status).await
    }

    /// Resolves a bet and releases its payouts.
    ///
    /// # Errors
    /// `ReleasePending` when the resolution committed but the ledger release
    /// failed; the event has still been emitted.
    pub async fn resolve(
        &self,
        bet_id: BetId,
        actor: &str,
        outcome: Outcome,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Resolution> {
        let bet = self.repo.load_bet(bet_id).await?;
        let participants = self.repo.load_participants(bet_id).await?;
        let resolution = self
            .lifecycle
            .resolve(&bet, &participants, actor, outcome, reason, now)?;

        let saved = self
            .repo
            .save_bet_and_participants(
                &resolution.bet,
                resolution.participants(),
                Some(BetStatus::PendingResolution),
            )
            .await?;
        check_saved(saved, bet_id, BetStatus::PendingResolution)?;

        self.emit(resolution.event.clone());
        self.release(bet_id, &resolution.entries()).await?;
        Ok(resolution)
    }

    /// Releases the stored payouts of a RESOLVED bet whose release did not
    /// go through. Returns `false` if they were already released.
    ///
    /// # Errors
    /// `NotResolved` unless the bet is RESOLVED, or the ledger failure.
    pub async fn retry_release(&self, bet_id: BetId) -> Result<bool> {
        let bet = self.repo.load_bet(bet_id).await?;
        if bet.status != BetStatus::Resolved {
            return Err(EngineError::NotResolved {
                bet_id,
                status: bet.status,
            });
        }
        if self.ledger.is_released(bet_id).await? {
            debug!(bet_id = %bet_id, "Payouts already released");
            return Ok(false);
        }

        let participants = self.repo.load_participants(bet_id).await?;
        self.release(bet_id, &PayoutEntry::from_participants(&participants))
            .await?;
        Ok(true)
    }

    // =========================================================================
    // Sweep
    // =========================================================================

    /// Sweeps one bet. `None` when it was not due or had already moved on.
    pub async fn sweep_bet(&self, bet_id: BetId, now: DateTime<Utc>) -> Result<Option<TransitionEvent>> {
        let bet = self.repo.load_bet(bet_id).await?;
        let count = self.repo.load_participants(bet_id).await?.len();

        let Some(transition) = self.lifecycle.expire(&bet, count, now) else {
            debug!(bet_id = %bet_id, status = %bet.status, "Sweep skipped bet");
            return Ok(None);
        };

        let event = transition.event.clone();
        self.commit(transition, bet.status).await?;
        Ok(Some(event))
    }

    /// Sweeps every due bet. Per-bet failures are tallied, never fatal.
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let candidates = self.repo.list_sweep_candidates(now).await?;
        let mut report = SweepReport::default();

        for bet_id in candidates {
            report.examined += 1;
            match self.sweep_bet(bet_id, now).await {
                Ok(Some(event)) => report.record(event),
                Ok(None) => report.skipped += 1,
                Err(e @ EngineError::Conflict { .. }) => {
                    warn!(bet_id = %bet_id, error = %e, "Sweep lost a concurrent update");
                    report.conflicts += 1;
                }
                Err(e) => {
                    error!(bet_id = %bet_id, error = %e, "Sweep failed for bet");
                    report.failed += 1;
                }
            }
        }

        if report.examined > 0 {
            info!(
                examined = report.examined,
                moved_to_pending = report.moved_to_pending,
                cancelled = report.cancelled,
                skipped = report.skipped,
                conflicts = report.conflicts,
                failed = report.failed,
                "Sweep complete"
            );
        }
        Ok(report)
    }

    // =========================================================================
    // Disputes
    // =========================================================================

    pub async fn file_dispute(
        &self,
        bet_id: BetId,
        filer_id: &str,
        reason: DisputeReason,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<Dispute> {
        let bet = self.repo.load_bet(bet_id).await?;
        let participants = self.repo.load_participants(bet_id).await?;
        let prior = self.repo.load_disputes(bet_id).await?;
        let filed = self
            .gate
            .file_dispute(&bet, &prior, filer_id, reason, description, now)?;

        if let Err(e) = self.ledger.hold(bet_id).await {
            error!(bet_id = %bet_id, error = %e, "Payout hold failed, dispute not filed");
            return Err(e);
        }

        let saved = self
            .repo
            .save_dispute(
                &filed.transition.bet,
                &participants,
                &filed.dispute,
                BetStatus::Resolved,
            )
            .await;
        if !matches!(saved, Ok(SaveOutcome::Saved)) {
            self.undo_hold(bet_id, &participants).await;
        }
        check_saved(saved?, bet_id, BetStatus::Resolved)?;

        self.emit(filed.transition.event);
        Ok(filed.dispute)
    }

    /// Rejects a dispute and releases the payouts computed at resolution.
    ///
    /// # Errors
    /// `ReleasePending` when the rejection committed but the ledger release
    /// failed.
    pub async fn reject_dispute(
        &self,
        bet_id: BetId,
        dispute_id: DisputeId,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Dispute> {
        let bet = self.repo.load_bet(bet_id).await?;
        let participants = self.repo.load_participants(bet_id).await?;
        let dispute = self.find_dispute(bet_id, dispute_id).await?;
        let released = self.ledger.is_released(bet_id).await?;

        let adjudication = self.gate.reject(&bet, &dispute, released, actor, now)?;
        let saved = self
            .repo
            .save_dispute(
                &adjudication.transition.bet,
                &participants,
                &adjudication.dispute,
                BetStatus::Disputed,
            )
            .await?;
        check_saved(saved, bet_id, BetStatus::Disputed)?;

        self.emit(adjudication.transition.event);
        self.release(bet_id, &PayoutEntry::from_participants(&participants))
            .await?;
        Ok(adjudication.dispute)
    }

    /// Upholds a dispute; payouts stay held until the bet is resolved again.
    pub async fn uphold_dispute(
        &self,
        bet_id: BetId,
        dispute_id: DisputeId,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Dispute> {
        let bet = self.repo.load_bet(bet_id).await?;
        let participants = self.repo.load_participants(bet_id).await?;
        let dispute = self.find_dispute(bet_id, dispute_id).await?;

        let adjudication = self.gate.uphold(&bet, &dispute, &participants, actor, now)?;
        let reset = adjudication.participants.as_deref().unwrap_or(&participants);
        let saved = self
            .repo
            .save_dispute(
                &adjudication.transition.bet,
                reset,
                &adjudication.dispute,
                BetStatus::Disputed,
            )
            .await?;
        check_saved(saved, bet_id, BetStatus::Disputed)?;

        self.emit(adjudication.transition.event);
        Ok(adjudication.dispute)
    }

    // =========================================================================
    // Odds
    // =========================================================================

    /// Informational live quote from the bet's current stakes.
    pub async fn quote(&self, bet_id: BetId) -> Result<OddsQuote> {
        let participants = self.repo.load_participants(bet_id).await?;
        self.odds
            .quote(stake_on(&participants, Side::A), stake_on(&participants, Side::B))
            .map_err(|e| EngineError::InvalidOdds(e.to_string()))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn commit(&self, transition: Transition, expected: BetStatus) -> Result<Bet> {
        let outcome = self.repo.save_bet(&transition.bet, Some(expected)).await?;
        check_saved(outcome, transition.bet.id, expected)?;
        self.emit(transition.event);
        Ok(transition.bet)
    }

    async fn find_dispute(&self, bet_id: BetId, dispute_id: DisputeId) -> Result<Dispute> {
        self.repo
            .load_disputes(bet_id)
            .await?
            .into_iter()
            .find(|d| d.id == dispute_id)
            .ok_or(EngineError::DisputeNotFound { dispute_id })
    }

    async fn release(&self, bet_id: BetId, entries: &[PayoutEntry]) -> Result<()> {
        if let Err(e) = self.ledger.release(bet_id, entries).await {
            error!(bet_id = %bet_id, error = %e, "Payout release failed after commit");
            return Err(EngineError::ReleasePending {
                bet_id,
                reason: e.to_string(),
            });
        }
        info!(bet_id = %bet_id, entries = entries.len(), "Payouts released");
        Ok(())
    }

    // Re-releases payouts held for a dispute that was never recorded. A bet
    // that moved on to DISPUTED keeps the hold for the dispute that won.
    async fn undo_hold(&self, bet_id: BetId, participants: &[Participant]) {
        match self.repo.load_bet(bet_id).await {
            Ok(bet) if bet.status == BetStatus::Resolved => {
                let entries = PayoutEntry::from_participants(participants);
                match self.ledger.release(bet_id, &entries).await {
                    Ok(()) => info!(bet_id = %bet_id, "Payout hold undone"),
                    Err(e) => error!(
                        bet_id = %bet_id,
                        error = %e,
                        "Could not undo payout hold, retry_release required"
                    ),
                }
            }
            Ok(bet) => debug!(bet_id = %bet_id, status = %bet.status, "Hold kept"),
            Err(e) => error!(bet_id = %bet_id, error = %e, "Could not reload bet to undo hold"),
        }
    }

    fn emit(&self, event: TransitionEvent) {
        info!(bet_id = %event.bet_id, from = %event.from, to = %event.to, "Bet transitioned");
        if self.events.send(event).is_err() {
            debug!("No transition subscribers");
        }
    }
}

fn check_saved(outcome: SaveOutcome, bet_id: BetId, expected: BetStatus) -> Result<()> {
    match outcome {
        SaveOutcome::Saved => Ok(()),
        SaveOutcome::Conflict { current } => {
            warn!(
                bet_id = %bet_id,
                expected = %expected,
                current = ?current,
                "Guarded save rejected"
            );
            Err(EngineError::conflict(bet_id, expected))
        }
    }
}
