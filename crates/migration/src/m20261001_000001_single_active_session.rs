//! At most one session may be active at a time.
//!
//! A partial unique index over `active` only covers rows where it is true,
//! so any number of closed sessions coexist while a second concurrent open
//! fails with a unique violation. Raw SQL, valid on SQLite and Postgres.

use sea_orm_migration::{prelude::*, sea_orm::ConnectionTrait};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS \"idx-sessions-single_active\" \
                 ON sessions (active) WHERE active",
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS \"idx-sessions-single_active\"")
            .await?;
        Ok(())
    }
}
