use engine::{CategoryScope, EngineError, EntryKind, EntryListFilter, MoneyCents, Shift};

mod common;
use common::*;

#[tokio::test]
async fn names_are_unique_after_normalization() {
    let (engine, _db) = engine_with_db().await;

    let cafe = engine
        .create_category("  Café   Bar ", CategoryScope::Expense, "admin")
        .await
        .unwrap();
    assert_eq!(cafe.name, "Café Bar");
    assert_eq!(cafe.scope, CategoryScope::Expense);
    assert!(cafe.active);
    assert_eq!(cafe.created_by.as_deref(), Some("admin"));

    let err = engine
        .create_category("cafe-bar", CategoryScope::Income, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let err = engine
        .create_category("   ", CategoryScope::Income, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidName(_)));
}

#[tokio::test]
async fn listing_respects_activity_and_entry_kind() {
    let (engine, _db) = engine_with_db().await;
    let (sales, supplies) = seed_categories(&engine).await;
    let misc = engine
        .create_category("Misc", CategoryScope::Both, "admin")
        .await
        .unwrap();
    engine.set_category_active(supplies, false).await.unwrap();

    let all = engine.list_categories(false).await.unwrap();
    assert_eq!(all.len(), 3);
    let active = engine.list_categories(true).await.unwrap();
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|c| c.id != supplies));

    let for_income: Vec<i64> = engine
        .categories_for(EntryKind::Income)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(for_income, vec![misc.id, sales]);

    let for_expense: Vec<i64> = engine
        .categories_for(EntryKind::Expense)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(for_expense, vec![misc.id]);

    let err = engine.set_category_active(9_999, true).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn withdrawal_category_is_provisioned_once() {
    let (engine, db) = engine_with_db().await;

    for actor in ["ana", "luis"] {
        let session = open(&engine, actor, Shift::Morning).await;
        engine
            .close_session_with_withdrawal(session.id, actor, MoneyCents::new(1_000))
            .await
            .unwrap();
    }

    let withdrawal = engine.categories_for(EntryKind::Withdrawal).await.unwrap();
    assert_eq!(withdrawal.len(), 1);
    assert_eq!(withdrawal[0].scope, CategoryScope::Withdrawal);
    assert_eq!(withdrawal[0].created_by.as_deref(), Some("ana"));
    assert_eq!(count(&db, "SELECT COUNT(*) FROM categories").await, 1);
}

#[tokio::test]
async fn existing_withdrawal_category_is_reused_by_scope() {
    let (engine, db) = engine_with_db().await;
    let cash_out = engine
        .create_category("Cash out", CategoryScope::Withdrawal, "admin")
        .await
        .unwrap();

    let session = open(&engine, "ana", Shift::Afternoon).await;
    engine
        .close_session_with_withdrawal(session.id, "ana", MoneyCents::new(300))
        .await
        .unwrap();

    let (entries, _) = engine
        .list_entries(
            &EntryListFilter {
                kind: Some(EntryKind::Withdrawal),
                ..Default::default()
            },
            0,
            0,
        )
        .await
        .unwrap();
    assert_eq!(entries[0].category_id, cash_out.id);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM categories").await, 1);
}

#[tokio::test]
async fn withdrawal_category_is_matched_by_name() {
    let (engine, db) = engine_with_db().await;
    let retiro = engine
        .create_category("Retiro de caja", CategoryScope::Expense, "admin")
        .await
        .unwrap();

    let session = open(&engine, "ana", Shift::Morning).await;
    engine
        .close_session_with_withdrawal(session.id, "ana", MoneyCents::new(300))
        .await
        .unwrap();

    let (entries, _) = engine
        .list_entries(
            &EntryListFilter {
                session_id: Some(session.id),
                ..Default::default()
            },
            0,
            0,
        )
        .await
        .unwrap();
    assert_eq!(entries[0].category_id, retiro.id);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM categories").await, 1);
}

#[tokio::test]
async fn provisioning_avoids_a_retired_homonym() {
    let (engine, db) = engine_with_db().await;
    let old = engine
        .create_category("Withdrawal", CategoryScope::Withdrawal, "admin")
        .await
        .unwrap();
    engine.set_category_active(old.id, false).await.unwrap();

    let session = open(&engine, "ana", Shift::Morning).await;
    engine
        .close_session_with_withdrawal(session.id, "ana", MoneyCents::new(300))
        .await
        .unwrap();

    let active = engine.categories_for(EntryKind::Withdrawal).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_ne!(active[0].id, old.id);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM categories").await, 2);
}

#[tokio::test]
async fn provisioning_skips_every_retired_withdrawal_name() {
    let (engine, db) = engine_with_db().await;
    for name in ["Withdrawal", "Withdrawal (cash box)"] {
        let retired = engine
            .create_category(name, CategoryScope::Withdrawal, "admin")
            .await
            .unwrap();
        engine.set_category_active(retired.id, false).await.unwrap();
    }

    let mut provisioned = Vec::new();
    for _ in 0..3 {
        let session = open(&engine, "ana", Shift::Morning).await;
        engine
            .close_session_with_withdrawal(session.id, "ana", MoneyCents::new(300))
            .await
            .unwrap();
        let active = engine.categories_for(EntryKind::Withdrawal).await.unwrap();
        assert_eq!(active.len(), 1);
        provisioned.push(active[0].clone());
    }

    // One new category, created on the first close and reused afterwards.
    assert_eq!(provisioned[0].name, "Withdrawal (cash box 2)");
    assert!(provisioned.iter().all(|c| c.id == provisioned[0].id));
    assert_eq!(count(&db, "SELECT COUNT(*) FROM categories").await, 3);
    assert_eq!(entry_count(&db).await, 3);
}
