//! Bet lifecycle state machine.
//!
//! ```text
//! DRAFT -> ACTIVE -> LIVE
//!            |        |
//!            +--------+--> PENDING_RESOLUTION -> RESOLVED <-> DISPUTED
//!            |        |            ^                            |
//!            +--------+--> CANCELLED         (dispute upheld)   |
//!                                  +----------------------------+
//! ```
//!
//! Every operation is pure: it takes the current bet and returns the updated
//! copy plus a [`TransitionEvent`]. Persisting the result behind a status
//! guard is the caller's job.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use wager_core::{
    Bet, BetStatus, EngineError, NewBet, Outcome, Participant, PayoutEntry, Result, Side,
    TransitionEvent,
};

use crate::payout::{self, Distribution, PayoutDistributor};
use crate::sweep::{self, SweepAction};

/// A bet after a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub bet: Bet,
    pub event: TransitionEvent,
}

/// A bet after PENDING_RESOLUTION -> RESOLVED, with its payouts.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub bet: Bet,
    pub distribution: Distribution,
    pub event: TransitionEvent,
}

impl Resolution {
    /// Participants with payouts written.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.distribution.participants
    }

    /// Ledger entries to release.
    #[must_use]
    pub fn entries(&self) -> Vec<PayoutEntry> {
        self.distribution.entries()
    }
}

/// Moves `bet` to `to` if the transition table allows it.
pub(crate) fn apply(bet: &Bet, to: BetStatus, now: DateTime<Utc>) -> Result<Transition> {
    if !bet.status.can_transition_to(to) {
        return Err(EngineError::invalid_transition(bet.id, bet.status, to));
    }

    let mut next = bet.clone();
    next.status = to;
    next.updated_at = now;

    Ok(Transition {
        event: TransitionEvent::new(bet.id, bet.status, to, now),
        bet: next,
    })
}

/// Governs valid transitions of a bet between statuses.
#[derive(Debug, Clone, Copy, Default)]
pub struct BetLifecycle {
    distributor: PayoutDistributor,
}

impl BetLifecycle {
    #[must_use]
    pub fn new(distributor: PayoutDistributor) -> Self {
        Self { distributor }
    }

    /// Creates a bet in DRAFT, or ACTIVE when `new_bet.publish` is set.
    ///
    /// # Errors
    /// Rejects a blank title, unnamed sides and deadlines not in the future.
    pub fn create(&self, new_bet: NewBet, now: DateTime<Utc>) -> Result<Bet> {
        if new_bet.title.trim().is_empty() {
            return Err(EngineError::EmptyTitle);
        }

        let bet = Bet {
            id: Uuid::new_v4(),
            title: new_bet.title,
            description: new_bet.description,
            category: new_bet.category,
            status: if new_bet.publish {
                BetStatus::Active
            } else {
                BetStatus::Draft
            },
            creator_id: new_bet.creator_id,
            resolver_id: new_bet.resolver_id,
            side_a_name: new_bet.side_a_name,
            side_b_name: new_bet.side_b_name,
            deadline: new_bet.deadline,
            winning_side: None,
            resolution_reason: None,
            resolved_by: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };
        validate_open(&bet, now)?;

        Ok(bet)
    }

    /// DRAFT -> ACTIVE.
    ///
    /// # Errors
    /// Only the creator may publish; side names and deadline are re-checked.
    pub fn publish(&self, bet: &Bet, actor: &str, now: DateTime<Utc>) -> Result<Transition> {
        if bet.creator_id != actor {
            return Err(EngineError::unauthorized(bet.id, actor, "publish"));
        }
        let transition = apply(bet, BetStatus::Active, now)?;
        validate_open(&transition.bet, now)?;
        Ok(transition)
    }

    /// ACTIVE -> LIVE when the underlying event starts.
    ///
    /// # Errors
    /// Fails from any status other than ACTIVE.
    pub fn start_live(&self, bet: &Bet, now: DateTime<Utc>) -> Result<Transition> {
        apply(bet, BetStatus::Live, now)
    }

    /// Validates a join and builds the new participant.
    ///
    /// # Errors
    /// The bet must be ACTIVE or LIVE and before its deadline, the stake
    /// positive whole cents, and the user not already in.
    pub fn join(
        &self,
        bet: &Bet,
        existing: &[Participant],
        user_id: &str,
        side: Side,
        stake: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Participant> {
        payout::check_stake(stake)?;
        if !bet.status.accepts_joins() {
            return Err(EngineError::JoinClosed {
                bet_id: bet.id,
                status: bet.status,
            });
        }
        if bet.is_expired(now) {
            return Err(EngineError::DeadlinePassed {
                bet_id: bet.id,
                deadline: bet.deadline,
            });
        }
        if existing.iter().any(|p| p.user_id == user_id) {
            return Err(EngineError::DuplicateParticipant {
                bet_id: bet.id,
                user_id: user_id.to_string(),
            });
        }

        Ok(Participant::new(bet.id, user_id, side, stake, now))
    }

    /// Creator cancellation; only possible before anyone joins.
    ///
    /// # Errors
    /// Fails for non-creators, bets not ACTIVE or LIVE, or bets with
    /// participants.
    pub fn cancel(
        &self,
        bet: &Bet,
        actor: &str,
        participant_count: usize,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        if bet.creator_id != actor {
            return Err(EngineError::unauthorized(bet.id, actor, "cancel"));
        }
        let mut transition = apply(bet, BetStatus::Cancelled, now)?;
        if participant_count > 0 {
            return Err(EngineError::ParticipantsExist {
                bet_id: bet.id,
                count: participant_count,
            });
        }
        transition.bet.winning_side = Some(Outcome::NoContest);
        Ok(transition)
    }

    /// Expiration sweep step. `None` when the bet is not due or already
    /// moved on, which makes repeated sweeps harmless.
    #[must_use]
    pub fn expire(
        &self,
        bet: &Bet,
        participant_count: usize,
        now: DateTime<Utc>,
    ) -> Option<Transition> {
        let action = sweep::evaluate(bet, participant_count, now);
        let mut transition = apply(bet, action.target()?, now).ok()?;
        if action == SweepAction::ToCancelled {
            transition.bet.winning_side = Some(Outcome::NoContest);
        }
        Some(transition)
    }

    /// PENDING_RESOLUTION -> RESOLVED, computing payouts in the same step.
    ///
    /// Any earlier payouts on `participants` are overwritten, never merged.
    ///
    /// # Errors
    /// Fails unless the bet is PENDING_RESOLUTION and `actor` is the creator
    /// or designated resolver; propagates payout validation errors.
    pub fn resolve(
        &self,
        bet: &Bet,
        participants: &[Participant],
        actor: &str,
        outcome: Outcome,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Resolution> {
        if bet.status != BetStatus::PendingResolution {
            return Err(EngineError::invalid_transition(
                bet.id,
                bet.status,
                BetStatus::Resolved,
            ));
        }
        if !bet.is_authorized_resolver(actor) {
            return Err(EngineError::unauthorized(bet.id, actor, "resolve"));
        }
        if let Some(stray) = participants.iter().find(|p| p.bet_id != bet.id) {
            return Err(EngineError::ForeignParticipant {
                bet_id: bet.id,
                participant_id: stray.id,
            });
        }

        let distribution = self.distributor.distribute(participants, outcome)?;
        let Transition { mut bet, event } = apply(bet, BetStatus::Resolved, now)?;
        bet.winning_side = Some(outcome);
        bet.resolution_reason = Some(reason.to_string());
        bet.resolved_by = Some(actor.to_string());
        bet.resolved_at = Some(now);

        info!(
            bet_id = %bet.id,
            %outcome,
            total_pot = %distribution.total_pot,
            winning_stake = %distribution.winning_stake,
            refunded = distribution.refunded,
            "Bet resolved"
        );

        Ok(Resolution {
            bet,
            distribution,
            event,
        })
    }
}

fn validate_open(bet: &Bet, now: DateTime<Utc>) -> Result<()> {
    for side in [Side::A, Side::B] {
        if bet.side_name(side).trim().is_empty() {
            return Err(EngineError::EmptySideName { side });
        }
    }
    if bet.deadline <= now {
        return Err(EngineError::DeadlineInPast {
            deadline: bet.deadline,
        });
    }
    Ok(())
}
