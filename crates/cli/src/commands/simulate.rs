//! End-to-end simulation on the in-memory store.
//!
//! Walks one bet through create, join, sweep, resolve, dispute and
//! adjudication on a simulated clock, then prints every transition event and
//! the final payouts.

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::info;

use wager_core::{
    BetStatus, ConfigLoader, DisputeReason, EngineConfig, NewBet, Outcome, Side,
};
use wager_settlement::{InMemoryBetStore, SettlementService};

use super::odds::format_american;

/// Arguments for the simulate command.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Uphold the dispute and re-resolve for side B instead of rejecting it.
    #[arg(long)]
    pub uphold: bool,

    /// Config file path (defaults apply when omitted).
    #[arg(short, long)]
    pub config: Option<String>,
}

pub async fn run_simulate(args: SimulateArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => EngineConfig::default(),
    };

    let store = Arc::new(InMemoryBetStore::new());
    let service = SettlementService::new(store.clone(), store.clone(), &config)?;
    let mut events = service.subscribe();

    let now = Utc::now();
    let bet = service
        .create_bet(
            NewBet {
                title: "Team X beats Team Y".to_string(),
                description: "Simulated friendly wager".to_string(),
                category: "soccer".to_string(),
                creator_id: "alice".to_string(),
                resolver_id: Some("referee".to_string()),
                side_a_name: "Team X".to_string(),
                side_b_name: "Team Y".to_string(),
                deadline: now + Duration::hours(1),
                publish: false,
            },
            now,
        )
        .await?;
    service.publish(bet.id, "alice", now).await?;

    let stakes: [(&str, Side, Decimal); 4] = [
        ("bob", Side::A, dec!(100)),
        ("carol", Side::A, dec!(50)),
        ("dave", Side::B, dec!(75)),
        ("erin", Side::B, dec!(25)),
    ];
    for (user, side, stake) in stakes {
        service.join(bet.id, user, side, stake, now).await?;
    }

    let quote = service.quote(bet.id).await?;
    let show = |odds: Option<i64>| odds.map_or_else(|| "n/a".to_string(), format_american);
    println!(
        "Live odds: A {}  B {}",
        show(quote.side_a),
        show(quote.side_b)
    );

    let report = service.run_sweep(bet.deadline).await?;
    info!(moved = report.moved_to_pending, "Deadline sweep done");

    let resolved_at = bet.deadline + Duration::minutes(30);
    service
        .resolve(bet.id, "referee", Outcome::Winner(Side::A), "Team X won 3-1", resolved_at)
        .await?;

    let disputed_at = resolved_at + Duration::hours(2);
    let dispute = service
        .file_dispute(
            bet.id,
            "dave",
            DisputeReason::IncorrectOutcome,
            "Final score was 1-3",
            disputed_at,
        )
        .await?;

    let adjudicated_at = disputed_at + Duration::hours(1);
    if args.uphold {
        service
            .uphold_dispute(bet.id, dispute.id, "moderator", adjudicated_at)
            .await?;
        service
            .resolve(
                bet.id,
                "referee",
                Outcome::Winner(Side::B),
                "Corrected: Team Y won 3-1",
                adjudicated_at + Duration::minutes(5),
            )
            .await?;
    } else {
        service
            .reject_dispute(bet.id, dispute.id, "moderator", adjudicated_at)
            .await?;
    }

    println!("\nTransitions:");
    while let Ok(event) = events.try_recv() {
        println!("  {event}");
    }

    let final_bet = service.bet(bet.id).await?;
    let winner = final_bet
        .winning_side
        .map_or_else(|| "-".to_string(), |o| o.to_string());
    println!("\nFinal status: {} (winner: {winner})", final_bet.status);

    println!("\nPayouts:");
    for p in service.participants(bet.id).await? {
        println!(
            "  {:<6} side {}  stake {:>7}  payout {:>7}",
            p.user_id, p.side, p.stake, p.payout
        );
    }

    if final_bet.status == BetStatus::Resolved {
        let released = store
            .ledger_record(bet.id)
            .is_some_and(|record| record.released);
        println!("\nPayouts released: {released}");
    }

    Ok(())
}
