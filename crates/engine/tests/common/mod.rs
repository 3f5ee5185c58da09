#![allow(dead_code)]

use std::{path::PathBuf, time::Duration};

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    CategoryScope, Engine, NewEntry, OpenSessionCmd, OpeningBalancePolicy, Session, Shift,
};
use migration::MigratorTrait;
use uuid::Uuid;

/// In-memory ledger on a single pooled connection, so every handle sees the
/// same database.
pub async fn connect() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

/// File-backed ledger behind a pool of several connections, so concurrent
/// operations really run on different SQLite connections.
pub async fn engine_with_file_db() -> (Engine, DatabaseConnection, PathBuf) {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join(format!("caja_{}.db", Uuid::new_v4()));

    let mut options = ConnectOptions::new(format!("sqlite:{}?mode=rwc", path.display()));
    options.max_connections(8).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db, path)
}

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = connect().await;
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn engine_with_policy(policy: OpeningBalancePolicy) -> (Engine, DatabaseConnection) {
    let db = connect().await;
    let engine = Engine::builder()
        .database(db.clone())
        .opening_balance(policy)
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn engine_with_timeout(db: &DatabaseConnection, timeout: Duration) -> Engine {
    Engine::builder()
        .database(db.clone())
        .operation_timeout(timeout)
        .build()
        .await
        .unwrap()
}

pub async fn open(engine: &Engine, actor: &str, shift: Shift) -> Session {
    engine
        .open_session(OpenSessionCmd::new(actor, shift))
        .await
        .unwrap()
}

/// Creates an income and an expense category, returning their ids.
pub async fn seed_categories(engine: &Engine) -> (i64, i64) {
    let income = engine
        .create_category("Sales", CategoryScope::Income, "admin")
        .await
        .unwrap();
    let expense = engine
        .create_category("Supplies", CategoryScope::Expense, "admin")
        .await
        .unwrap();
    (income.id, expense.id)
}

pub fn income(cents: i64, shift: Shift, category_id: i64) -> NewEntry {
    NewEntry::income(engine::MoneyCents::new(cents), shift, category_id)
}

pub fn expense(cents: i64, shift: Shift, category_id: i64) -> NewEntry {
    NewEntry::expense(engine::MoneyCents::new(cents), shift, category_id)
}

pub async fn count(db: &DatabaseConnection, sql: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(backend, sql.to_string()))
        .await
        .unwrap()
        .unwrap();
    row.try_get_by_index::<i64>(0).unwrap()
}

pub async fn entry_count(db: &DatabaseConnection) -> i64 {
    count(db, "SELECT COUNT(*) FROM entries").await
}

pub async fn active_session_count(db: &DatabaseConnection) -> i64 {
    count(db, "SELECT COUNT(*) FROM sessions WHERE active").await
}
