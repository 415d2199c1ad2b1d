//! Live quote from stake totals.

use anyhow::Result;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use wager_core::ConfigLoader;
use wager_odds::{implied_probability, DynamicOddsCalculator, OddsQuote};

use super::odds::format_american;

/// Arguments for the quote command.
#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Total staked on side A.
    #[arg(long)]
    pub stake_a: Decimal,

    /// Total staked on side B.
    #[arg(long)]
    pub stake_b: Decimal,

    /// House margin override (0.05 = 5%).
    #[arg(long)]
    pub vig: Option<Decimal>,

    /// Config file path.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print the quote as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct QuoteOutput {
    #[serde(flatten)]
    quote: OddsQuote,
    vig: Decimal,
}

pub fn run_quote(args: QuoteArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let vig = args.vig.unwrap_or(config.odds.vig);
    let calculator = DynamicOddsCalculator::new(vig, config.odds.default_american)?;
    let quote = calculator.quote(args.stake_a, args.stake_b)?;
    info!(stake_a = %args.stake_a, stake_b = %args.stake_b, %vig, "Quote computed");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&QuoteOutput { quote, vig })?);
        return Ok(());
    }

    for (name, odds) in [("A", quote.side_a), ("B", quote.side_b)] {
        match odds {
            Some(odds) => println!(
                "Side {name}: {:>6}  ({}% implied)",
                format_american(odds),
                implied_probability(odds)?.round_dp(2)
            ),
            None => println!("Side {name}:    n/a"),
        }
    }
    println!("Overround: {}", quote.overround.round_dp(4));
    Ok(())
}
