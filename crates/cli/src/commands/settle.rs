//! Offline payout computation.
//!
//! Reads a JSON array of `{ "user_id", "side", "stake" }` records and prints
//! the pari-mutuel distribution for the given outcome.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wager_core::{Outcome, Participant, Side, UserId};
use wager_settlement::PayoutDistributor;

/// Arguments for the settle command.
#[derive(Args, Debug)]
pub struct SettleArgs {
    /// Participants JSON file.
    #[arg(short, long)]
    pub input: String,

    /// Winning side (A or B), or `void` for a no-contest refund.
    #[arg(short, long)]
    pub winner: Outcome,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantInput {
    pub user_id: UserId,
    pub side: Side,
    pub stake: Decimal,
}

#[derive(Debug, Serialize)]
struct PayoutLine {
    user_id: UserId,
    side: Side,
    stake: Decimal,
    payout: Decimal,
}

#[derive(Debug, Serialize)]
struct SettleOutput {
    outcome: Outcome,
    total_pot: Decimal,
    winning_stake: Decimal,
    residual: Decimal,
    refunded: bool,
    payouts: Vec<PayoutLine>,
}

pub fn run_settle(args: SettleArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input))?;
    let inputs: Vec<ParticipantInput> =
        serde_json::from_str(&raw).with_context(|| format!("invalid participants in {}", args.input))?;

    // File order stands in for join order.
    let bet_id = Uuid::new_v4();
    let start = Utc::now();
    let participants: Vec<Participant> = inputs
        .into_iter()
        .zip(0i64..)
        .map(|(input, i)| {
            Participant::new(
                bet_id,
                input.user_id,
                input.side,
                input.stake,
                start + Duration::milliseconds(i),
            )
        })
        .collect();

    let distribution = PayoutDistributor::new().distribute(&participants, args.winner)?;
    let output = SettleOutput {
        outcome: args.winner,
        total_pot: distribution.total_pot,
        winning_stake: distribution.winning_stake,
        residual: distribution.residual,
        refunded: distribution.refunded,
        payouts: distribution
            .participants
            .into_iter()
            .map(|p| PayoutLine {
                user_id: p.user_id,
                side: p.side,
                stake: p.stake,
                payout: p.payout,
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
