//! Dispute gate between resolution and payout release.
//!
//! Filing a dispute moves a RESOLVED bet to DISPUTED and holds payouts.
//! Adjudication either rejects it (back to RESOLVED, payouts released as
//! computed) or upholds it (back to PENDING_RESOLUTION with the resolution
//! cleared, so the resolver settles again from scratch).

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use wager_core::{
    Bet, BetStatus, Dispute, DisputeConfig, DisputeReason, DisputeStatus, EngineError,
    Participant, Result,
};

use crate::lifecycle::{apply, Transition};

/// A newly filed dispute and the RESOLVED -> DISPUTED transition.
#[derive(Debug, Clone, PartialEq)]
pub struct FiledDispute {
    pub dispute: Dispute,
    pub transition: Transition,
}

/// Outcome of adjudicating a dispute.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjudication {
    pub dispute: Dispute,
    pub transition: Transition,
    /// Participants with payouts reset; only set when the dispute is upheld.
    pub participants: Option<Vec<Participant>>,
}

#[derive(Debug, Clone)]
pub struct DisputeGate {
    config: DisputeConfig,
    window: Duration,
}

impl Default for DisputeGate {
    fn default() -> Self {
        let config = DisputeConfig::default();
        Self {
            window: Duration::hours(config.window_hours),
            config,
        }
    }
}

impl DisputeGate {
    /// Builds a gate from config.
    ///
    /// # Errors
    /// `InvalidConfig` if `window_hours` is negative or too large for a
    /// time span.
    pub fn new(config: DisputeConfig) -> Result<Self> {
        let window = Duration::try_hours(config.window_hours)
            .filter(|_| config.window_hours >= 0)
            .ok_or_else(|| {
                EngineError::InvalidConfig(format!(
                    "dispute.window_hours must be between 0 and {}, got {}",
                    Duration::MAX.num_hours(),
                    config.window_hours
                ))
            })?;
        Ok(Self { config, window })
    }

    /// Last instant a dispute may be filed for the bet's current resolution.
    #[must_use]
    pub fn window_closes_at(&self, bet: &Bet) -> DateTime<Utc> {
        bet.resolved_at
            .unwrap_or(bet.updated_at)
            .checked_add_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Files a dispute against a RESOLVED bet.
    ///
    /// `prior` holds every dispute stored for the bet. Only those filed
    /// against the current resolution count toward the refile rule.
    ///
    /// # Errors
    /// `NotResolved`, `SelfDispute`, `DisputeWindowClosed`,
    /// `DisputeAlreadyOpen` or `RefilingNotAllowed`.
    pub fn file_dispute(
        &self,
        bet: &Bet,
        prior: &[Dispute],
        filer_id: &str,
        reason: DisputeReason,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<FiledDispute> {
        if bet.status != BetStatus::Resolved {
            return Err(EngineError::NotResolved {
                bet_id: bet.id,
                status: bet.status,
            });
        }
        if bet.resolved_by.as_deref() == Some(filer_id) {
            return Err(EngineError::SelfDispute {
                bet_id: bet.id,
                user_id: filer_id.to_string(),
            });
        }

        let closed_at = self.window_closes_at(bet);
        if now > closed_at {
            return Err(EngineError::DisputeWindowClosed {
                bet_id: bet.id,
                closed_at,
            });
        }

        if let Some(open) = prior.iter().find(|d| d.status == DisputeStatus::Open) {
            return Err(EngineError::DisputeAlreadyOpen {
                bet_id: bet.id,
                dispute_id: open.id,
            });
        }

        let resolved_at = bet.resolved_at.unwrap_or(bet.updated_at);
        let rejected_before = prior
            .iter()
            .any(|d| d.status == DisputeStatus::Rejected && d.filed_at >= resolved_at);
        if rejected_before && !self.config.allow_refile_after_rejection {
            return Err(EngineError::RefilingNotAllowed { bet_id: bet.id });
        }

        let transition = apply(bet, BetStatus::Disputed, now)?;
        let dispute = Dispute {
            id: Uuid::new_v4(),
            bet_id: bet.id,
            filer_id: filer_id.to_string(),
            respondent_id: bet.respondent().to_string(),
            reason,
            description: description.to_string(),
            filed_at: now,
            status: DisputeStatus::Open,
            adjudicated_at: None,
            adjudicated_by: None,
        };

        info!(
            bet_id = %bet.id,
            dispute_id = %dispute.id,
            filer = %dispute.filer_id,
            ?reason,
            "Dispute filed"
        );

        Ok(FiledDispute {
            dispute,
            transition,
        })
    }

    /// Rejects an open dispute; the original resolution stands.
    ///
    /// # Errors
    /// Fails if the dispute is not open, the adjudicator is a party to it,
    /// or the ledger already released payouts while the bet was disputed.
    pub fn reject(
        &self,
        bet: &Bet,
        dispute: &Dispute,
        payouts_released: bool,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Adjudication> {
        check_adjudicable(bet, dispute, actor)?;
        if payouts_released {
            return Err(EngineError::PayoutsAlreadyReleased { bet_id: bet.id });
        }

        let transition = apply(bet, BetStatus::Resolved, now)?;
        let dispute = close(dispute, DisputeStatus::Rejected, actor, now);
        info!(bet_id = %bet.id, dispute_id = %dispute.id, "Dispute rejected");

        Ok(Adjudication {
            dispute,
            transition,
            participants: None,
        })
    }

    /// Upholds an open dispute; the resolution is superseded and payouts
    /// reset until the bet is resolved again.
    ///
    /// # Errors
    /// Fails if the dispute is not open or the adjudicator is a party to it.
    pub fn uphold(
        &self,
        bet: &Bet,
        dispute: &Dispute,
        participants: &[Participant],
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Adjudication> {
        check_adjudicable(bet, dispute, actor)?;

        let mut transition = apply(bet, BetStatus::PendingResolution, now)?;
        transition.bet.winning_side = None;
        transition.bet.resolution_reason = None;
        transition.bet.resolved_by = None;
        transition.bet.resolved_at = None;

        let participants = participants
            .iter()
            .map(|p| Participant {
                payout: Decimal::ZERO,
                ..p.clone()
            })
            .collect();

        let dispute = close(dispute, DisputeStatus::Upheld, actor, now);
        info!(bet_id = %bet.id, dispute_id = %dispute.id, "Dispute upheld, resolution superseded");

        Ok(Adjudication {
            dispute,
            transition,
            participants: Some(participants),
        })
    }
}

fn check_adjudicable(bet: &Bet, dispute: &Dispute, actor: &str) -> Result<()> {
    if dispute.bet_id != bet.id {
        return Err(EngineError::DisputeNotFound {
            dispute_id: dispute.id,
        });
    }
    if dispute.status != DisputeStatus::Open {
        return Err(EngineError::DisputeNotOpen {
            dispute_id: dispute.id,
        });
    }
    // Parties to the dispute cannot decide it.
    if actor == dispute.filer_id || actor == dispute.respondent_id {
        return Err(EngineError::unauthorized(bet.id, actor, "adjudicate"));
    }
    Ok(())
}

fn close(dispute: &Dispute, status: DisputeStatus, actor: &str, now: DateTime<Utc>) -> Dispute {
    Dispute {
        status,
        adjudicated_at: Some(now),
        adjudicated_by: Some(actor.to_string()),
        ..dispute.clone()
    }
}
