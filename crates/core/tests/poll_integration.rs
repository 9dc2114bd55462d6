//! Poll store integration tests.
//!
//! These tests require a running `PostgreSQL` instance and exercise the
//! full vote/lifecycle protocol, including its concurrency guarantees.
//! Run with: `cargo test --test poll_integration -- --ignored`
//!
//! Environment variables: see `pollbot-db`'s `test_utils`.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;

use pollbot_common::{AppError, PollConfig};
use pollbot_core::{CreatePollInput, PollService, PollStore};
use pollbot_db::test_utils::TestDatabase;
use tokio::task::JoinSet;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn service_over(db: &TestDatabase) -> PollService {
    let config = PollConfig::default();
    let store = PollStore::new(db.connection().clone(), config.clone());
    PollService::new(store, &config)
}

fn lunch_poll(creator_id: &str) -> CreatePollInput {
    CreatePollInput {
        question: "lunch?".to_string(),
        creator_id: creator_id.to_string(),
        options: vec!["pizza".to_string(), "sushi".to_string()],
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_poll_lifecycle_scenario() {
    init_logging();
    let db = TestDatabase::create_unique().await.unwrap();
    let service = service_over(&db);

    // Create: tally initialized to zero for every option.
    let created = service.create_poll(lunch_poll("u1")).await.unwrap();
    let poll_id = created.poll.id.clone();
    assert_eq!(poll_id.len(), pollbot_common::POLL_ID_LEN);

    let tally = service.get_tally(&poll_id).await.unwrap();
    assert_eq!(tally.counts(), BTreeMap::from([(1, 0), (2, 0)]));

    // First vote counts.
    service.cast_vote(&poll_id, "u2", 1).await.unwrap();
    let tally = service.get_tally(&poll_id).await.unwrap();
    assert_eq!(tally.counts(), BTreeMap::from([(1, 1), (2, 0)]));

    // Re-voting is rejected, tally unchanged.
    let err = service.cast_vote(&poll_id, "u2", 1).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyVoted));
    let tally = service.get_tally(&poll_id).await.unwrap();
    assert_eq!(tally.counts(), BTreeMap::from([(1, 1), (2, 0)]));

    // Only the creator can end.
    let err = service.end_poll(&poll_id, "u3").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    service.end_poll(&poll_id, "u1").await.unwrap();

    // Ended polls reject votes but stay queryable.
    let err = service.cast_vote(&poll_id, "u4", 2).await.unwrap_err();
    assert!(matches!(err, AppError::PollEnded));
    let tally = service.get_tally(&poll_id).await.unwrap();
    assert_eq!(tally.counts(), BTreeMap::from([(1, 1), (2, 0)]));

    // Ending twice reports the state violation.
    let err = service.end_poll(&poll_id, "u1").await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyEnded));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_distinct_voters_lose_no_votes() {
    init_logging();
    let db = TestDatabase::create_unique().await.unwrap();
    let config = PollConfig::default();
    let store = PollStore::new(db.connection().clone(), config.clone());
    let service = PollService::new(store.clone(), &config);

    let created = service.create_poll(lunch_poll("u1")).await.unwrap();
    let poll_id = created.poll.id.clone();

    const VOTERS: i32 = 16;
    let mut tasks = JoinSet::new();
    for i in 0..VOTERS {
        let service = service.clone();
        let poll_id = poll_id.clone();
        tasks.spawn(async move {
            service
                .cast_vote(&poll_id, &format!("voter-{i}"), i % 2 + 1)
                .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    let tally = service.get_tally(&poll_id).await.unwrap();
    let sum: i32 = tally.counts().values().sum();
    assert_eq!(sum, VOTERS);

    // Ledger and tally agree.
    let ledger = store.vote_ledger(&poll_id).await.unwrap();
    assert_eq!(ledger.len() as i32, VOTERS);
    let mut replayed: BTreeMap<i32, i32> = tally.counts().keys().map(|&k| (k, 0)).collect();
    for vote in ledger {
        *replayed.get_mut(&vote.choice_id).unwrap() += 1;
    }
    assert_eq!(replayed, tally.counts());

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_same_user_casts_exactly_one_vote() {
    init_logging();
    let db = TestDatabase::create_unique().await.unwrap();
    let service = service_over(&db);

    let created = service.create_poll(lunch_poll("u1")).await.unwrap();
    let poll_id = created.poll.id.clone();

    const ATTEMPTS: usize = 8;
    let mut tasks = JoinSet::new();
    for i in 0..ATTEMPTS {
        let service = service.clone();
        let poll_id = poll_id.clone();
        let choice = (i % 2) as i32 + 1;
        tasks.spawn(async move { service.cast_vote(&poll_id, "u2", choice).await });
    }

    let mut wins = 0;
    let mut conflicts = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(()) => wins += 1,
            Err(AppError::AlreadyVoted) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(conflicts, ATTEMPTS - 1);

    let tally = service.get_tally(&poll_id).await.unwrap();
    let sum: i32 = tally.counts().values().sum();
    assert_eq!(sum, 1);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_delete_poll_removes_it_for_good() {
    init_logging();
    let db = TestDatabase::create_unique().await.unwrap();
    let service = service_over(&db);

    let created = service.create_poll(lunch_poll("u1")).await.unwrap();
    let poll_id = created.poll.id.clone();
    service.cast_vote(&poll_id, "u2", 2).await.unwrap();

    // Non-creator cannot delete; the poll stays intact.
    let err = service.delete_poll(&poll_id, "u2").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(service.get_tally(&poll_id).await.is_ok());

    service.delete_poll(&poll_id, "u1").await.unwrap();

    let err = service.get_tally(&poll_id).await.unwrap_err();
    assert!(matches!(err, AppError::PollNotFound(_)));
    let err = service.cast_vote(&poll_id, "u3", 1).await.unwrap_err();
    assert!(matches!(err, AppError::PollNotFound(_)));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_vote_racing_end_resolves_consistently() {
    init_logging();
    let db = TestDatabase::create_unique().await.unwrap();
    let service = service_over(&db);

    let created = service.create_poll(lunch_poll("u1")).await.unwrap();
    let poll_id = created.poll.id.clone();

    let vote_service = service.clone();
    let vote_poll = poll_id.clone();
    let voter = tokio::spawn(async move { vote_service.cast_vote(&vote_poll, "u2", 1).await });

    let end_service = service.clone();
    let end_poll_id = poll_id.clone();
    let ender = tokio::spawn(async move { end_service.end_poll(&end_poll_id, "u1").await });

    let vote_result = voter.await.unwrap();
    ender.await.unwrap().unwrap();

    // Either the vote landed before the end, or it observed the ended
    // state; in both cases ledger and tally agree.
    let tally = service.get_tally(&poll_id).await.unwrap();
    let sum: i32 = tally.counts().values().sum();
    match vote_result {
        Ok(()) => assert_eq!(sum, 1),
        Err(AppError::PollEnded) => assert_eq!(sum, 0),
        Err(other) => panic!("unexpected error: {other}"),
    }

    db.drop_database().await.unwrap();
}
