use std::time::Duration;

use sea_orm::{ConnectionTrait, TransactionTrait};

use engine::{EngineError, ErrorKind, MoneyCents, OpenSessionCmd, OpeningBalancePolicy, Shift};

mod common;
use common::*;

#[tokio::test]
async fn first_open_starts_active_from_zero() {
    let (engine, _db) = engine_with_db().await;

    assert!(!engine.is_last_session_open().await.unwrap());
    assert!(engine.last_session().await.unwrap().is_none());

    let session = open(&engine, "1", Shift::Morning).await;
    assert!(session.active);
    assert!(session.closed_at.is_none());
    assert_eq!(session.opening_balance, MoneyCents::ZERO);
    assert_eq!(session.actor_id, "1");
    assert_eq!(session.shift, Shift::Morning);
    assert!(engine.is_last_session_open().await.unwrap());
}

#[tokio::test]
async fn reopening_closes_the_previous_session() {
    let (engine, db) = engine_with_db().await;

    let first = open(&engine, "1", Shift::Morning).await;
    let second = open(&engine, "1", Shift::Morning).await;
    assert_ne!(first.id, second.id);

    let first = engine.session(first.id).await.unwrap();
    assert!(!first.active);
    assert!(first.closed_at.is_some());
    assert_eq!(first.closing_balance, Some(MoneyCents::ZERO));

    let last = engine.last_session().await.unwrap().unwrap();
    assert_eq!(last.id, second.id);
    assert!(last.active);
    assert_eq!(active_session_count(&db).await, 1);
}

#[tokio::test]
async fn open_closes_sessions_of_other_actors_too() {
    let (engine, db) = engine_with_db().await;
    let (sales, _) = seed_categories(&engine).await;

    let morning = open(&engine, "ana", Shift::Morning).await;
    engine
        .create_entries("ana", vec![income(12_000, Shift::Morning, sales)])
        .await
        .unwrap();

    open(&engine, "luis", Shift::Afternoon).await;

    let morning = engine.session(morning.id).await.unwrap();
    assert!(!morning.active);
    assert_eq!(morning.closing_balance, Some(MoneyCents::new(12_000)));
    assert_eq!(active_session_count(&db).await, 1);
}

#[tokio::test]
async fn open_with_confirmation_refuses_to_close_silently() {
    let (engine, db) = engine_with_db().await;
    let first = open(&engine, "1", Shift::Morning).await;

    let err = engine
        .open_session(OpenSessionCmd::new("2", Shift::Afternoon).require_confirmation())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::SessionAlreadyOpen {
            session_id: first.id
        }
    );

    let still = engine.session(first.id).await.unwrap();
    assert!(still.active);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM sessions").await, 1);

    engine.close_session(first.id, "1").await.unwrap();
    let second = engine
        .open_session(OpenSessionCmd::new("2", Shift::Afternoon).require_confirmation())
        .await
        .unwrap();
    assert!(second.active);
}

#[tokio::test]
async fn single_active_session_holds_across_open_close_sequences() {
    let (engine, db) = engine_with_db().await;

    for round in 0..4 {
        let shift = if round % 2 == 0 {
            Shift::Morning
        } else {
            Shift::Afternoon
        };
        let actor = format!("actor-{round}");
        let session = open(&engine, &actor, shift).await;
        assert_eq!(active_session_count(&db).await, 1);
        if round == 2 {
            engine.close_session(session.id, &actor).await.unwrap();
            assert_eq!(active_session_count(&db).await, 0);
        }
    }

    let (a, b) = tokio::join!(
        engine.open_session(OpenSessionCmd::new("x", Shift::Morning)),
        engine.open_session(OpenSessionCmd::new("y", Shift::Afternoon)),
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(active_session_count(&db).await, 1);
}

#[tokio::test]
async fn schema_rejects_a_second_active_session() {
    let (engine, db) = engine_with_db().await;
    open(&engine, "1", Shift::Morning).await;

    let result = db
        .execute_unprepared(
            "INSERT INTO sessions (actor_id, shift, opened_at, active, opening_balance_minor, business_date) \
             VALUES ('2', 'T', '2026-01-01 08:00:00', 1, 0, '2026-01-01')",
        )
        .await;
    assert!(result.is_err());
    assert_eq!(active_session_count(&db).await, 1);
}

#[tokio::test]
async fn close_checks_existence_ownership_and_state() {
    let (engine, _db) = engine_with_db().await;
    let session = open(&engine, "ana", Shift::Morning).await;

    let err = engine.close_session(999, "ana").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = engine.close_session(session.id, "luis").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(engine.session(session.id).await.unwrap().active);

    let closed = engine.close_session(session.id, "ana").await.unwrap();
    assert!(!closed.active);
    assert!(closed.closed_at.is_some());
    assert_eq!(closed.closing_balance, Some(MoneyCents::ZERO));

    let err = engine.close_session(session.id, "ana").await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyClosed(_)));
    assert!(!engine.is_last_session_open().await.unwrap());
}

#[tokio::test]
async fn close_with_withdrawal_books_entry_and_freezes_balance() {
    let (engine, db) = engine_with_db().await;
    let (sales, _) = seed_categories(&engine).await;
    let session = open(&engine, "ana", Shift::Afternoon).await;
    engine
        .create_entries("ana", vec![income(20_000, Shift::Afternoon, sales)])
        .await
        .unwrap();

    let closed = engine
        .close_session_with_withdrawal(session.id, "ana", MoneyCents::new(5_000))
        .await
        .unwrap();
    assert!(!closed.active);
    assert_eq!(closed.closing_balance, Some(MoneyCents::new(15_000)));

    let filter = engine::EntryListFilter {
        session_id: Some(session.id),
        kind: Some(engine::EntryKind::Withdrawal),
        ..Default::default()
    };
    let (withdrawals, total) = engine.list_entries(&filter, 0, 0).await.unwrap();
    assert_eq!(total, 1);
    let withdrawal = &withdrawals[0];
    assert_eq!(withdrawal.amount, MoneyCents::new(5_000));
    assert_eq!(withdrawal.shift, Shift::Afternoon);
    assert_eq!(withdrawal.created_by, "ana");
    assert!(withdrawal.details.is_some());

    let categories = engine
        .categories_for(engine::EntryKind::Withdrawal)
        .await
        .unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(withdrawal.category_id, categories[0].id);
    assert_eq!(entry_count(&db).await, 2);
}

#[tokio::test]
async fn zero_withdrawal_is_a_plain_close() {
    let (engine, db) = engine_with_db().await;
    let session = open(&engine, "ana", Shift::Morning).await;

    let closed = engine
        .close_session_with_withdrawal(session.id, "ana", MoneyCents::ZERO)
        .await
        .unwrap();
    assert!(!closed.active);
    assert_eq!(entry_count(&db).await, 0);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM categories").await, 0);
}

#[tokio::test]
async fn negative_withdrawal_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let session = open(&engine, "ana", Shift::Morning).await;

    let err = engine
        .close_session_with_withdrawal(session.id, "ana", MoneyCents::new(-1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(engine.session(session.id).await.unwrap().active);
}

#[tokio::test]
async fn close_with_withdrawal_checks_ownership_before_writing() {
    let (engine, db) = engine_with_db().await;
    let session = open(&engine, "ana", Shift::Morning).await;

    let err = engine
        .close_session_with_withdrawal(session.id, "luis", MoneyCents::new(100))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(entry_count(&db).await, 0);
}

#[tokio::test]
async fn failed_close_rolls_back_the_withdrawal_entry() {
    let (engine, db) = engine_with_db().await;
    let (sales, _) = seed_categories(&engine).await;
    let session = open(&engine, "ana", Shift::Morning).await;
    engine
        .create_entries("ana", vec![income(10_000, Shift::Morning, sales)])
        .await
        .unwrap();
    let entries_before = entry_count(&db).await;
    let categories_before = count(&db, "SELECT COUNT(*) FROM categories").await;

    // The entry insert succeeds; freezing the session row then fails.
    db.execute_unprepared(
        "CREATE TRIGGER fail_session_close BEFORE UPDATE ON sessions \
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
    )
    .await
    .unwrap();

    let err = engine
        .close_session_with_withdrawal(session.id, "ana", MoneyCents::new(4_000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);

    db.execute_unprepared("DROP TRIGGER fail_session_close")
        .await
        .unwrap();

    assert_eq!(entry_count(&db).await, entries_before);
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM categories").await,
        categories_before
    );
    let session = engine.session(session.id).await.unwrap();
    assert!(session.active);
    assert!(session.closing_balance.is_none());
}

#[tokio::test]
async fn carry_forward_policy_starts_from_previous_closing() {
    let (engine, _db) = engine_with_policy(OpeningBalancePolicy::CarryForward).await;
    let (sales, supplies) = seed_categories(&engine).await;

    let first = open(&engine, "ana", Shift::Morning).await;
    engine
        .create_entries(
            "ana",
            vec![
                income(30_000, Shift::Morning, sales),
                expense(2_500, Shift::Morning, supplies),
            ],
        )
        .await
        .unwrap();
    engine.close_session(first.id, "ana").await.unwrap();

    let second = open(&engine, "luis", Shift::Afternoon).await;
    assert_eq!(second.opening_balance, MoneyCents::new(27_500));

    engine
        .create_entries("luis", vec![income(500, Shift::Afternoon, sales)])
        .await
        .unwrap();
    // Implicit close freezes 28_000, which the next session inherits.
    let third = open(&engine, "ana", Shift::Morning).await;
    assert_eq!(third.opening_balance, MoneyCents::new(28_000));
}

#[tokio::test]
async fn expired_deadline_rolls_back_the_open() {
    let db = connect().await;
    let engine = engine_with_timeout(&db, Duration::from_millis(50)).await;

    // Hold the only pooled connection so the operation cannot make progress.
    let blocker = db.begin().await.unwrap();
    let err = engine
        .open_session(OpenSessionCmd::new("ana", Shift::Morning))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Timeout(_)));
    assert!(err.is_retryable());
    blocker.rollback().await.unwrap();

    assert_eq!(count(&db, "SELECT COUNT(*) FROM sessions").await, 0);
    assert!(!engine.is_last_session_open().await.unwrap());
}

#[tokio::test]
async fn blank_actor_is_forbidden() {
    let (engine, db) = engine_with_db().await;
    let err = engine
        .open_session(OpenSessionCmd::new("  ", Shift::Morning))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM sessions").await, 0);
}
