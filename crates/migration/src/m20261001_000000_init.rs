//! Initial schema for the cash-box ledger:
//!
//! - `sessions`: open/close cycles of the cash box
//! - `categories`: entry categories and the kinds they accept
//! - `entries`: income, expense and withdrawal movements (soft-deletable)
//! - `entry_sequences`: per-day counters for entry references

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Sessions {
    Table,
    Id,
    ActorId,
    Shift,
    OpenedAt,
    ClosedAt,
    Active,
    OpeningBalanceMinor,
    ClosingBalanceMinor,
    BusinessDate,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    Name,
    NameNorm,
    Scope,
    Active,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum Entries {
    Table,
    Id,
    Reference,
    Kind,
    EntryDate,
    AmountMinor,
    Shift,
    CategoryId,
    Details,
    CreatedBy,
    CreatedAt,
    UpdatedBy,
    UpdatedAt,
    DeletedBy,
    DeletedAt,
    SessionId,
}

#[derive(Iden)]
enum EntrySequences {
    Table,
    Day,
    LastValue,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ─────────────────────────────────────────────────────────────────────
        // Sessions
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sessions::ActorId).string().not_null())
                    .col(ColumnDef::new(Sessions::Shift).string_len(1).not_null())
                    .col(ColumnDef::new(Sessions::OpenedAt).timestamp().not_null())
                    .col(ColumnDef::new(Sessions::ClosedAt).timestamp())
                    .col(
                        ColumnDef::new(Sessions::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Sessions::OpeningBalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Sessions::ClosingBalanceMinor).big_integer())
                    .col(ColumnDef::new(Sessions::BusinessDate).date().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sessions-actor_id-shift-active")
                    .table(Sessions::Table)
                    .col(Sessions::ActorId)
                    .col(Sessions::Shift)
                    .col(Sessions::Active)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sessions-business_date")
                    .table(Sessions::Table)
                    .col(Sessions::BusinessDate)
                    .to_owned(),
            )
            .await?;

        // ─────────────────────────────────────────────────────────────────────
        // Categories
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::NameNorm).string().not_null())
                    .col(ColumnDef::new(Categories::Scope).string().not_null())
                    .col(
                        ColumnDef::new(Categories::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Categories::CreatedBy).string())
                    .col(ColumnDef::new(Categories::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-name_norm-unique")
                    .table(Categories::Table)
                    .col(Categories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ─────────────────────────────────────────────────────────────────────
        // Entries
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Entries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Entries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Entries::Reference).string().not_null())
                    .col(ColumnDef::new(Entries::Kind).string().not_null())
                    .col(ColumnDef::new(Entries::EntryDate).timestamp().not_null())
                    .col(ColumnDef::new(Entries::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Entries::Shift).string_len(1).not_null())
                    .col(ColumnDef::new(Entries::CategoryId).big_integer().not_null())
                    .col(ColumnDef::new(Entries::Details).string())
                    .col(ColumnDef::new(Entries::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Entries::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Entries::UpdatedBy).string())
                    .col(ColumnDef::new(Entries::UpdatedAt).timestamp())
                    .col(ColumnDef::new(Entries::DeletedBy).string())
                    .col(ColumnDef::new(Entries::DeletedAt).timestamp())
                    .col(ColumnDef::new(Entries::SessionId).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-entries-session_id")
                            .from(Entries::Table, Entries::SessionId)
                            .to(Sessions::Table, Sessions::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-entries-category_id")
                            .from(Entries::Table, Entries::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-entries-reference-unique")
                    .table(Entries::Table)
                    .col(Entries::Reference)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-entries-session_id-kind")
                    .table(Entries::Table)
                    .col(Entries::SessionId)
                    .col(Entries::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-entries-created_at")
                    .table(Entries::Table)
                    .col(Entries::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ─────────────────────────────────────────────────────────────────────
        // Entry sequences
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(EntrySequences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EntrySequences::Day)
                            .string_len(8)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EntrySequences::LastValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(EntrySequences::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Entries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        Ok(())
    }
}
