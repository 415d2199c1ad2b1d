//! Periodic expiration sweeper.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info};

use wager_core::{BetRepository, SettlementLedger, SweepConfig};

use crate::service::SettlementService;

/// Runs the expiration sweep every `config.interval_secs` until `shutdown`
/// reads `true` or its sender is dropped.
///
/// The first sweep runs immediately.
pub async fn run<R, L>(
    service: Arc<SettlementService<R, L>>,
    config: SweepConfig,
    mut shutdown: watch::Receiver<bool>,
) where
    R: BetRepository,
    L: SettlementLedger,
{
    info!(interval_secs = config.interval_secs, "Sweeper started");
    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = service.run_sweep(Utc::now()).await {
                    error!(error = %e, "Sweep run failed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Sweeper stopped");
}
