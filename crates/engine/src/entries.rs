//! Ledger entries ("movements").
//!
//! An `Entry` is one cash movement recorded against an open session. The
//! amount is always positive; `EntryKind` decides its sign in the balance.
//! Entries are never physically deleted: `deleted_at`/`deleted_by` mark a
//! soft delete and every read path ignores such rows.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{EngineError, MoneyCents, ResultEngine, Shift};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Income,
    Expense,
    Withdrawal,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "withdrawal" => Ok(Self::Withdrawal),
            other => Err(EngineError::InvalidKind(format!(
                "invalid entry kind: {other}"
            ))),
        }
    }
}

impl FromStr for EntryKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.trim().to_lowercase().as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub reference: String,
    pub kind: EntryKind,
    pub entry_date: DateTime<Utc>,
    pub amount: MoneyCents,
    pub shift: Shift,
    pub category_id: i64,
    pub details: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub session_id: i64,
}

impl Entry {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub reference: String,
    pub kind: String,
    pub entry_date: DateTimeUtc,
    pub amount_minor: i64,
    pub shift: String,
    pub category_id: i64,
    pub details: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTimeUtc>,
    pub deleted_by: Option<String>,
    pub deleted_at: Option<DateTimeUtc>,
    pub session_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sessions::Entity",
        from = "Column::SessionId",
        to = "super::sessions::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Sessions,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Categories,
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Entry {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            reference: model.reference,
            kind: EntryKind::try_from(model.kind.as_str())?,
            entry_date: model.entry_date,
            amount: MoneyCents::new(model.amount_minor),
            shift: Shift::try_from(model.shift.as_str())?,
            category_id: model.category_id,
            details: model.details,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_by: model.updated_by,
            updated_at: model.updated_at,
            deleted_by: model.deleted_by,
            deleted_at: model.deleted_at,
            session_id: model.session_id,
        })
    }
}

/// Row values for a freshly created entry; the id is assigned by the store.
pub(crate) struct NewEntryRow {
    pub reference: String,
    pub kind: EntryKind,
    pub entry_date: DateTime<Utc>,
    pub amount: MoneyCents,
    pub shift: Shift,
    pub category_id: i64,
    pub details: Option<String>,
    pub created_by: String,
    pub session_id: i64,
}

impl From<NewEntryRow> for ActiveModel {
    fn from(row: NewEntryRow) -> Self {
        Self {
            id: ActiveValue::NotSet,
            reference: ActiveValue::Set(row.reference),
            kind: ActiveValue::Set(row.kind.as_str().to_string()),
            entry_date: ActiveValue::Set(row.entry_date),
            amount_minor: ActiveValue::Set(row.amount.cents()),
            shift: ActiveValue::Set(row.shift.as_str().to_string()),
            category_id: ActiveValue::Set(row.category_id),
            details: ActiveValue::Set(row.details),
            created_by: ActiveValue::Set(row.created_by),
            created_at: ActiveValue::Set(row.entry_date),
            updated_by: ActiveValue::Set(None),
            updated_at: ActiveValue::Set(None),
            deleted_by: ActiveValue::Set(None),
            deleted_at: ActiveValue::Set(None),
            session_id: ActiveValue::Set(row.session_id),
        }
    }
}
