//! Pari-mutuel payout distribution.
//!
//! The losing pool is split among winners in proportion to stake:
//!
//! ```text
//! payout(winner) = stake + (total_pot - winning_stake) * stake / winning_stake
//! payout(loser)  = 0
//! ```
//!
//! If nobody backed the winning side, or the outcome is void, every stake is
//! refunded exactly.
//!
//! # Rounding
//!
//! Stakes are whole cents. Each winner's exact share is floored to cents and
//! the cents left over are handed out one at a time by largest remainder,
//! ties going to the anchor winner first (largest stake, then earliest join,
//! then lowest participant id). Payouts sum to the pot exactly, and every
//! winner ends within one cent of their exact share, never below their stake.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use wager_core::{EngineError, Outcome, Participant, PayoutEntry, Result};

/// Payouts are rounded to currency minor units.
pub const PAYOUT_DECIMALS: u32 = 2;

/// Result of distributing a pot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Participants with their payout written.
    pub participants: Vec<Participant>,
    /// Sum of all stakes.
    pub total_pot: Decimal,
    /// Sum of stakes on the winning side (zero for void outcomes).
    pub winning_stake: Decimal,
    /// Cents handed out by largest remainder after flooring each share.
    pub residual: Decimal,
    /// True when every stake was refunded.
    pub refunded: bool,
}

impl Distribution {
    /// Sum of payouts; equals `total_pot`.
    #[must_use]
    pub fn total_paid(&self) -> Decimal {
        self.participants.iter().map(|p| p.payout).sum()
    }

    /// Ledger entries for non-zero payouts.
    #[must_use]
    pub fn entries(&self) -> Vec<PayoutEntry> {
        PayoutEntry::from_participants(&self.participants)
    }
}

/// Computes each participant's payout for a resolved outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayoutDistributor;

impl PayoutDistributor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Distributes the pot among `participants` for `outcome`.
    ///
    /// # Errors
    /// Rejects non-positive stakes and participants from different bets.
    pub fn distribute(&self, participants: &[Participant], outcome: Outcome) -> Result<Distribution> {
        validate(participants)?;

        let total_pot: Decimal = participants.iter().map(|p| p.stake).sum();
        let winning_stake: Decimal = participants
            .iter()
            .filter(|p| outcome.side_wins(p.side))
            .map(|p| p.stake)
            .sum();

        if winning_stake.is_zero() {
            return Ok(refund(participants, total_pot));
        }

        let losing_pool = total_pot - winning_stake;
        let mut paid = participants.to_vec();
        // (index, sub-cent remainder) per winner
        let mut remainders = Vec::new();
        for (i, p) in paid.iter_mut().enumerate() {
            if outcome.side_wins(p.side) {
                let exact = p.stake + losing_pool * p.stake / winning_stake;
                p.payout = floor_cents(exact);
                remainders.push((i, exact - p.payout));
            } else {
                p.payout = Decimal::ZERO;
            }
        }

        let distributed: Decimal = paid.iter().map(|p| p.payout).sum();
        let residual = total_pot - distributed;
        if residual > Decimal::ZERO {
            remainders.sort_by(|(i, a), (j, b)| {
                b.cmp(a)
                    .then_with(|| anchor_order(&participants[*j], &participants[*i]))
            });
            let cent = Decimal::new(1, PAYOUT_DECIMALS);
            let mut left = residual;
            for (i, _) in remainders.iter().cycle() {
                if left < cent {
                    break;
                }
                paid[*i].payout += cent;
                left -= cent;
            }
            debug!(%residual, winners = remainders.len(), "Distributed rounding residual");
        }

        Ok(Distribution {
            participants: paid,
            total_pot,
            winning_stake,
            residual,
            refunded: false,
        })
    }
}

/// Checks a stake is positive and in whole currency minor units.
///
/// # Errors
/// `NonPositiveStake` or `StakeTooPrecise`.
pub fn check_stake(stake: Decimal) -> Result<()> {
    if stake <= Decimal::ZERO {
        return Err(EngineError::NonPositiveStake { stake });
    }
    if stake.normalize().scale() > PAYOUT_DECIMALS {
        return Err(EngineError::StakeTooPrecise {
            stake,
            max_decimals: PAYOUT_DECIMALS,
        });
    }
    Ok(())
}

fn validate(participants: &[Participant]) -> Result<()> {
    let bet_id = participants.first().map(|p| p.bet_id);
    for p in participants {
        check_stake(p.stake)?;
        if Some(p.bet_id) != bet_id {
            return Err(EngineError::ForeignParticipant {
                bet_id: bet_id.unwrap_or(p.bet_id),
                participant_id: p.id,
            });
        }
    }
    Ok(())
}

fn refund(participants: &[Participant], total_pot: Decimal) -> Distribution {
    let participants = participants
        .iter()
        .map(|p| {
            let mut p = p.clone();
            p.payout = p.stake;
            p
        })
        .collect();

    Distribution {
        participants,
        total_pot,
        winning_stake: Decimal::ZERO,
        residual: Decimal::ZERO,
        refunded: true,
    }
}

// Larger stake wins; on ties the earlier join, then the lower id.
fn anchor_order(a: &Participant, b: &Participant) -> Ordering {
    a.stake
        .cmp(&b.stake)
        .then_with(|| b.joined_at.cmp(&a.joined_at))
        .then_with(|| b.id.cmp(&a.id))
}

fn floor_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PAYOUT_DECIMALS, RoundingStrategy::ToZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;
    use wager_core::Side;

    fn make_participants(bet_id: Uuid, stakes: &[(Side, Decimal)]) -> Vec<Participant> {
        let start = Utc::now();
        stakes
            .iter()
            .enumerate()
            .map(|(i, (side, stake))| {
                Participant::new(
                    bet_id,
                    format!("user-{i}"),
                    *side,
                    *stake,
                    start + Duration::seconds(i as i64),
                )
            })
            .collect()
    }

    fn payouts(distribution: &Distribution) -> Vec<Decimal> {
        distribution.participants.iter().map(|p| p.payout).collect()
    }

    #[test]
    fn test_even_book_side_a_wins() {
        let participants = make_participants(
            Uuid::new_v4(),
            &[
                (Side::A, dec!(50)),
                (Side::A, dec!(50)),
                (Side::B, dec!(50)),
                (Side::B, dec!(50)),
            ],
        );
        let result = PayoutDistributor::new()
            .distribute(&participants, Outcome::Winner(Side::A))
            .unwrap();

        assert_eq!(result.total_pot, dec!(200));
        assert_eq!(result.winning_stake, dec!(100));
        assert_eq!(payouts(&result), vec![dec!(100), dec!(100), dec!(0), dec!(0)]);
        assert!(!result.refunded);
    }

    #[test]
    fn test_underdog_side_wins() {
        let mut stakes = vec![(Side::A, dec!(50)); 8];
        stakes.extend([(Side::B, dec!(50)), (Side::B, dec!(50))]);
        let participants = make_participants(Uuid::new_v4(), &stakes);

        let result = PayoutDistributor::new()
            .distribute(&participants, Outcome::Winner(Side::B))
            .unwrap();

        assert_eq!(result.total_pot, dec!(500));
        for p in &result.participants {
            match p.side {
                Side::A => assert_eq!(p.payout, Decimal::ZERO),
                Side::B => assert_eq!(p.payout, dec!(250)),
            }
        }
        assert_eq!(result.total_paid(), dec!(500));
    }

    #[test]
    fn test_unbacked_winner_refunds_everyone() {
        let participants = make_participants(
            Uuid::new_v4(),
            &[(Side::B, dec!(20)), (Side::B, dec!(35.55)), (Side::B, dec!(0.01))],
        );
        let result = PayoutDistributor::new()
            .distribute(&participants, Outcome::Winner(Side::A))
            .unwrap();

        assert!(result.refunded);
        for p in &result.participants {
            assert_eq!(p.payout, p.stake);
        }
    }

    #[test]
    fn test_no_contest_refunds_both_sides() {
        let participants = make_participants(
            Uuid::new_v4(),
            &[(Side::A, dec!(10)), (Side::B, dec!(30))],
        );
        let result = PayoutDistributor::new()
            .distribute(&participants, Outcome::NoContest)
            .unwrap();

        assert!(result.refunded);
        assert_eq!(payouts(&result), vec![dec!(10), dec!(30)]);
    }

    #[test]
    fn test_empty_pot() {
        let result = PayoutDistributor::new()
            .distribute(&[], Outcome::Winner(Side::A))
            .unwrap();
        assert!(result.participants.is_empty());
        assert_eq!(result.total_pot, Decimal::ZERO);
        assert!(result.refunded);
    }

    #[test]
    fn test_positive_residual_goes_to_earliest_equal_stake() {
        // Each winner: 1 + 1/3 = 1.333 -> 1.33, sum 3.99, one cent left over
        let participants = make_participants(
            Uuid::new_v4(),
            &[
                (Side::A, dec!(1)),
                (Side::A, dec!(1)),
                (Side::A, dec!(1)),
                (Side::B, dec!(1)),
            ],
        );
        let result = PayoutDistributor::new()
            .distribute(&participants, Outcome::Winner(Side::A))
            .unwrap();

        assert_eq!(result.residual, dec!(0.01));
        assert_eq!(
            payouts(&result),
            vec![dec!(1.34), dec!(1.33), dec!(1.33), dec!(0)]
        );
        assert_eq!(result.total_paid(), result.total_pot);
    }

    #[test]
    fn test_residual_cents_spread_in_anchor_order() {
        // Winners: 1 + 2/3 = 1.666.. floored to 1.66 (x3) = 4.98, two cents left
        let participants = make_participants(
            Uuid::new_v4(),
            &[
                (Side::A, dec!(1)),
                (Side::A, dec!(1)),
                (Side::A, dec!(1)),
                (Side::B, dec!(2)),
            ],
        );
        let result = PayoutDistributor::new()
            .distribute(&participants, Outcome::Winner(Side::A))
            .unwrap();

        assert_eq!(result.residual, dec!(0.02));
        assert_eq!(result.total_paid(), dec!(5));
        assert_eq!(
            payouts(&result),
            vec![dec!(1.67), dec!(1.67), dec!(1.66), dec!(0)]
        );
    }

    #[test]
    fn test_tied_remainders_favor_larger_stake() {
        // Winner 1: 1 + 0.02 * 1/4 = 1.005 -> 1.00
        // Winner 2: 3 + 0.02 * 3/4 = 3.015 -> 3.01, plus the single leftover cent
        let participants = make_participants(
            Uuid::new_v4(),
            &[(Side::A, dec!(1)), (Side::A, dec!(3)), (Side::B, dec!(0.02))],
        );
        let result = PayoutDistributor::new()
            .distribute(&participants, Outcome::Winner(Side::A))
            .unwrap();

        assert_eq!(result.residual, dec!(0.01));
        assert_eq!(result.participants[0].payout, dec!(1.00));
        assert_eq!(result.participants[1].payout, dec!(3.02));
        assert_eq!(result.total_paid(), dec!(4.02));
    }

    #[test]
    fn test_largest_remainder_wins_the_cent() {
        // 2 + 1 * 2/3 = 2.666.. and 1 + 1 * 1/3 = 1.333..: the larger
        // remainder (0.0066..) takes the single leftover cent
        let participants = make_participants(
            Uuid::new_v4(),
            &[(Side::A, dec!(1)), (Side::A, dec!(2)), (Side::B, dec!(1))],
        );
        let result = PayoutDistributor::new()
            .distribute(&participants, Outcome::Winner(Side::A))
            .unwrap();
        assert_eq!(payouts(&result), vec![dec!(1.33), dec!(2.67), dec!(0)]);
    }

    #[test]
    fn test_many_tiny_winners_never_drop_below_stake() {
        // Each winner: 0.01 + 0.50 * 0.01 / 1.00 = 0.015 -> 0.01, fifty cents left
        let mut stakes = vec![(Side::A, dec!(0.01)); 100];
        stakes.push((Side::B, dec!(0.50)));
        let participants = make_participants(Uuid::new_v4(), &stakes);

        let result = PayoutDistributor::new()
            .distribute(&participants, Outcome::Winner(Side::A))
            .unwrap();

        assert_eq!(result.total_pot, dec!(1.50));
        assert_eq!(result.total_paid(), dec!(1.50));
        assert_eq!(result.residual, dec!(0.50));
        for p in result.participants.iter().filter(|p| p.side == Side::A) {
            assert!(p.payout >= p.stake, "payout {} below stake", p.payout);
            assert!(p.payout <= dec!(0.02), "payout {} above share + 1c", p.payout);
        }
        // Equal stakes: the earliest fifty joins take the extra cent.
        assert!(result.participants[..50].iter().all(|p| p.payout == dec!(0.02)));
        assert!(result.participants[50..100].iter().all(|p| p.payout == dec!(0.01)));
    }

    #[test]
    fn test_payouts_always_sum_to_pot() {
        let books: [&[(Side, Decimal)]; 5] = [
            &[(Side::A, dec!(7)), (Side::A, dec!(11)), (Side::A, dec!(13)), (Side::B, dec!(17))],
            &[(Side::A, dec!(0.01)), (Side::B, dec!(99.99)), (Side::B, dec!(0.03))],
            &[(Side::A, dec!(33.33)), (Side::A, dec!(33.33)), (Side::B, dec!(33.34))],
            &[(Side::B, dec!(5)), (Side::B, dec!(6)), (Side::B, dec!(7)), (Side::A, dec!(1000))],
            &[(Side::A, dec!(19.99)), (Side::B, dec!(0.07)), (Side::B, dec!(0.05))],
        ];

        for book in books {
            let participants = make_participants(Uuid::new_v4(), book);
            for side in [Side::A, Side::B] {
                let result = PayoutDistributor::new()
                    .distribute(&participants, Outcome::Winner(side))
                    .unwrap();
                assert_eq!(result.total_paid(), result.total_pot);
                assert!(result.residual.abs() <= dec!(0.01) * Decimal::from(book.len()));
                for p in &result.participants {
                    if p.side == side {
                        assert!(p.payout >= p.stake);
                    } else {
                        assert_eq!(p.payout, Decimal::ZERO);
                    }
                }
            }
        }
    }

    #[test]
    fn test_rejects_non_positive_stake() {
        let bet_id = Uuid::new_v4();
        let mut participants = make_participants(bet_id, &[(Side::A, dec!(10)), (Side::B, dec!(5))]);
        participants[1].stake = Decimal::ZERO;

        let err = PayoutDistributor::new()
            .distribute(&participants, Outcome::Winner(Side::A))
            .unwrap_err();
        assert!(matches!(err, EngineError::NonPositiveStake { .. }));
    }

    #[test]
    fn test_rejects_sub_cent_stake() {
        let participants = make_participants(
            Uuid::new_v4(),
            &[(Side::A, dec!(0.001)), (Side::B, dec!(1.00))],
        );
        let err = PayoutDistributor::new()
            .distribute(&participants, Outcome::Winner(Side::A))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::StakeTooPrecise {
                max_decimals: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_check_stake_ignores_trailing_zeros() {
        assert!(check_stake(dec!(1.500)).is_ok());
        assert!(check_stake(dec!(0.01)).is_ok());
        assert!(check_stake(dec!(2.005)).is_err());
        assert!(check_stake(dec!(-1)).is_err());
    }

    #[test]
    fn test_rejects_mixed_bets() {
        let mut participants = make_participants(Uuid::new_v4(), &[(Side::A, dec!(10))]);
        participants.extend(make_participants(Uuid::new_v4(), &[(Side::B, dec!(10))]));

        let err = PayoutDistributor::new()
            .distribute(&participants, Outcome::Winner(Side::A))
            .unwrap_err();
        assert!(matches!(err, EngineError::ForeignParticipant { .. }));
    }
}
