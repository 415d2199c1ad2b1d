use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::watch;

use wager_core::{
    BetId, BetStatus, DisputeReason, DisputeStatus, EngineConfig, EngineError, NewBet, Outcome,
    Side, SweepConfig,
};
use wager_settlement::{sweeper, InMemoryBetStore, SettlementService};

type Service = SettlementService<InMemoryBetStore, InMemoryBetStore>;

fn setup() -> (Arc<InMemoryBetStore>, Arc<Service>) {
    let store = Arc::new(InMemoryBetStore::new());
    let service = SettlementService::new(store.clone(), store.clone(), &EngineConfig::default())
        .expect("default config is valid");
    (store, Arc::new(service))
}

fn new_bet(deadline: DateTime<Utc>) -> NewBet {
    NewBet {
        title: "Team X beats Team Y".to_string(),
        description: "Friday night match".to_string(),
        category: "soccer".to_string(),
        creator_id: "alice".to_string(),
        resolver_id: None,
        side_a_name: "Team X".to_string(),
        side_b_name: "Team Y".to_string(),
        deadline,
        publish: true,
    }
}

async fn pending_bet(
    service: &Service,
    now: DateTime<Utc>,
    stakes: &[(&str, Side, Decimal)],
) -> BetId {
    let bet = service
        .create_bet(new_bet(now + Duration::hours(1)), now)
        .await
        .unwrap();
    for (user, side, stake) in stakes {
        service.join(bet.id, user, *side, *stake, now).await.unwrap();
    }
    let event = service.sweep_bet(bet.id, bet.deadline).await.unwrap();
    assert_eq!(event.map(|e| e.to), Some(BetStatus::PendingResolution));
    bet.id
}

#[tokio::test]
async fn test_full_lifecycle_with_events() {
    let (store, service) = setup();
    let mut events = service.subscribe();
    let now = Utc::now();

    let bet_id = pending_bet(
        &service,
        now,
        &[
            ("bob", Side::A, dec!(100)),
            ("carol", Side::B, dec!(50)),
            ("dave", Side::B, dec!(50)),
        ],
    )
    .await;

    let resolution = service
        .resolve(
            bet_id,
            "alice",
            Outcome::Winner(Side::B),
            "Team Y won 2-1",
            now + Duration::hours(2),
        )
        .await
        .unwrap();

    let payouts: Vec<(String, Decimal)> = resolution
        .participants()
        .iter()
        .map(|p| (p.user_id.clone(), p.payout))
        .collect();
    assert_eq!(
        payouts,
        vec![
            ("bob".to_string(), dec!(0)),
            ("carol".to_string(), dec!(100)),
            ("dave".to_string(), dec!(100)),
        ]
    );

    let stored = service.participants(bet_id).await.unwrap();
    assert_eq!(stored.iter().map(|p| p.payout).sum::<Decimal>(), dec!(200));
    assert!(store.ledger_record(bet_id).unwrap().released);

    let first = events.recv().await.unwrap();
    assert_eq!(
        (first.from, first.to),
        (BetStatus::Active, BetStatus::PendingResolution)
    );
    let second = events.recv().await.unwrap();
    assert_eq!(
        (second.from, second.to),
        (BetStatus::PendingResolution, BetStatus::Resolved)
    );
}

#[tokio::test]
async fn test_concurrent_resolution_has_single_winner() {
    let (store, service) = setup();
    let now = Utc::now();
    let bet_id = pending_bet(
        &service,
        now,
        &[("bob", Side::A, dec!(10)), ("carol", Side::B, dec!(10))],
    )
    .await;

    let a = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .resolve(bet_id, "alice", Outcome::Winner(Side::A), "A won", now)
                .await
        })
    };
    let b = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .resolve(bet_id, "alice", Outcome::Winner(Side::B), "B won", now)
                .await
        })
    };
    let results = [a.await.unwrap(), b.await.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(
            err,
            EngineError::Conflict { .. } | EngineError::InvalidTransition { .. }
        ));
    }

    let record = store.ledger_record(bet_id).unwrap();
    assert_eq!(record.release_count, 1);
    let stored = service.participants(bet_id).await.unwrap();
    assert_eq!(stored.iter().map(|p| p.payout).sum::<Decimal>(), dec!(20));
}

#[tokio::test]
async fn test_rejected_dispute_releases_original_payouts() {
    let (store, service) = setup();
    let now = Utc::now();
    let bet_id = pending_bet(
        &service,
        now,
        &[("bob", Side::A, dec!(100)), ("carol", Side::B, dec!(300))],
    )
    .await;
    service
        .resolve(bet_id, "alice", Outcome::Winner(Side::A), "A won", now)
        .await
        .unwrap();

    let dispute = service
        .file_dispute(bet_id, "carol", DisputeReason::IncorrectOutcome, "B won", now)
        .await
        .unwrap();
    assert_eq!(service.bet(bet_id).await.unwrap().status, BetStatus::Disputed);
    assert!(!store.ledger_record(bet_id).unwrap().released);

    let rejected = service
        .reject_dispute(bet_id, dispute.id, "moderator", now)
        .await
        .unwrap();
    assert_eq!(rejected.status, DisputeStatus::Rejected);

    let bet = service.bet(bet_id).await.unwrap();
    assert_eq!(bet.status, BetStatus::Resolved);
    assert_eq!(bet.winning_side, Some(Outcome::Winner(Side::A)));

    let record = store.ledger_record(bet_id).unwrap();
    assert!(record.released);
    assert_eq!(record.release_count, 2);
    assert_eq!(record.entries.len(), 1);
    assert_eq!(record.entries[0].amount, dec!(400));

    let err = service
        .file_dispute(bet_id, "carol", DisputeReason::Other, "again", now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RefilingNotAllowed { .. }));
}

#[tokio::test]
async fn test_upheld_dispute_supersedes_payouts() {
    let (store, service) = setup();
    let now = Utc::now();
    let bet_id = pending_bet(
        &service,
        now,
        &[("bob", Side::A, dec!(100)), ("carol", Side::B, dec!(300))],
    )
    .await;
    service
        .resolve(bet_id, "alice", Outcome::Winner(Side::A), "A won", now)
        .await
        .unwrap();

    let dispute = service
        .file_dispute(bet_id, "carol", DisputeReason::IncorrectOutcome, "B won", now)
        .await
        .unwrap();
    service
        .uphold_dispute(bet_id, dispute.id, "moderator", now)
        .await
        .unwrap();

    let reopened = service.bet(bet_id).await.unwrap();
    assert_eq!(reopened.status, BetStatus::PendingResolution);
    assert_eq!(reopened.winning_side, None);
    assert!(service
        .participants(bet_id)
        .await
        .unwrap()
        .iter()
        .all(|p| p.payout == Decimal::ZERO));
    assert!(!store.ledger_record(bet_id).unwrap().released);

    service
        .resolve(bet_id, "alice", Outcome::Winner(Side::B), "Replay showed B", now)
        .await
        .unwrap();
    let payouts: Vec<Decimal> = service
        .participants(bet_id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.payout)
        .collect();
    assert_eq!(payouts, vec![dec!(0), dec!(400)]);

    let record = store.ledger_record(bet_id).unwrap();
    assert!(record.released);
    assert_eq!(record.entries[0].amount, dec!(400));
    assert_eq!(service.disputes(bet_id).await.unwrap()[0].status, DisputeStatus::Upheld);
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let (_, service) = setup();
    let now = Utc::now();
    let joined = service
        .create_bet(new_bet(now + Duration::minutes(30)), now)
        .await
        .unwrap();
    service
        .join(joined.id, "bob", Side::A, dec!(5), now)
        .await
        .unwrap();
    let empty = service
        .create_bet(new_bet(now + Duration::minutes(45)), now)
        .await
        .unwrap();
    let later = service
        .create_bet(new_bet(now + Duration::days(1)), now)
        .await
        .unwrap();

    let at = now + Duration::hours(1);
    let first = service.run_sweep(at).await.unwrap();
    assert_eq!(first.examined, 2);
    assert_eq!(first.moved_to_pending, 1);
    assert_eq!(first.cancelled, 1);

    let second = service.run_sweep(at).await.unwrap();
    assert_eq!(second.examined, 0);
    assert_eq!(second.transitioned(), 0);

    assert_eq!(
        service.bet(joined.id).await.unwrap().status,
        BetStatus::PendingResolution
    );
    assert_eq!(service.bet(empty.id).await.unwrap().status, BetStatus::Cancelled);
    assert_eq!(service.bet(later.id).await.unwrap().status, BetStatus::Active);
}

#[tokio::test]
async fn test_sweeper_runs_until_shutdown() {
    let (_, service) = setup();
    let created_at = Utc::now() - Duration::hours(2);
    let bet = service
        .create_bet(new_bet(created_at + Duration::hours(1)), created_at)
        .await
        .unwrap();
    let mut events = service.subscribe();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(sweeper::run(
        service.clone(),
        SweepConfig { interval_secs: 1 },
        shutdown_rx,
    ));

    let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
        .await
        .expect("sweeper emitted within timeout")
        .unwrap();
    assert_eq!(event.bet_id, bet.id);
    assert_eq!(event.to, BetStatus::Cancelled);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(5), task)
        .await
        .expect("sweeper stopped")
        .unwrap();
}
