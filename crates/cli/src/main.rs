use clap::{Parser, Subcommand};

mod commands;

use commands::{OddsCommand, QuoteArgs, SettleArgs, SimulateArgs};

#[derive(Parser)]
#[command(name = "wager")]
#[command(about = "Social betting settlement engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert and combine odds
    Odds {
        #[command(subcommand)]
        command: OddsCommand,
    },
    /// Live quote for a pair of stake totals
    Quote(QuoteArgs),
    /// Compute pari-mutuel payouts from a participants file
    Settle(SettleArgs),
    /// Run a bet through its full lifecycle on the in-memory store
    Simulate(SimulateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Odds { command } => commands::run_odds(command)?,
        Commands::Quote(args) => commands::run_quote(args)?,
        Commands::Settle(args) => commands::run_settle(args)?,
        Commands::Simulate(args) => commands::run_simulate(args).await?,
    }

    Ok(())
}
