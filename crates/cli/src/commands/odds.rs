//! Odds conversion commands.

use anyhow::Result;
use clap::Subcommand;
use rust_decimal::Decimal;

use wager_odds::{american_to_decimal, combined_odds, decimal_to_american, implied_probability};

#[derive(Subcommand, Debug)]
pub enum OddsCommand {
    /// American odds to decimal odds
    ToDecimal {
        #[arg(allow_negative_numbers = true)]
        american: i64,
    },
    /// Decimal odds to American odds
    ToAmerican { decimal: Decimal },
    /// Implied win probability (percent) of American odds
    Implied {
        #[arg(allow_negative_numbers = true)]
        american: i64,
    },
    /// Parlay of several American odds
    Combine {
        #[arg(required = true, allow_negative_numbers = true)]
        legs: Vec<i64>,
    },
}

pub fn run_odds(command: OddsCommand) -> Result<()> {
    match command {
        OddsCommand::ToDecimal { american } => {
            println!("{}", american_to_decimal(american)?.round_dp(4));
        }
        OddsCommand::ToAmerican { decimal } => {
            println!("{}", format_american(decimal_to_american(decimal)?));
        }
        OddsCommand::Implied { american } => {
            println!("{}%", implied_probability(american)?.round_dp(2));
        }
        OddsCommand::Combine { legs } => {
            println!("{}", format_american(combined_odds(&legs)?));
        }
    }
    Ok(())
}

/// Positive American odds carry an explicit `+`.
pub fn format_american(odds: i64) -> String {
    if odds > 0 {
        format!("+{odds}")
    } else {
        odds.to_string()
    }
}
