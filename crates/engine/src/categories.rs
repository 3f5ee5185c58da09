//! Entry categories ("concepts").
//!
//! A category restricts which entry kinds may reference it through its
//! `CategoryScope`.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{EngineError, EntryKind, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryScope {
    Income,
    Expense,
    Withdrawal,
    /// Income and expense entries.
    Both,
}

impl CategoryScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Withdrawal => "withdrawal",
            Self::Both => "both",
        }
    }

    pub fn allows(self, kind: EntryKind) -> bool {
        matches!(
            (self, kind),
            (Self::Income, EntryKind::Income)
                | (Self::Expense, EntryKind::Expense)
                | (Self::Withdrawal, EntryKind::Withdrawal)
                | (Self::Both, EntryKind::Income | EntryKind::Expense)
        )
    }

    /// Scopes whose categories accept `kind`.
    pub fn accepting(kind: EntryKind) -> &'static [CategoryScope] {
        match kind {
            EntryKind::Income => &[Self::Income, Self::Both],
            EntryKind::Expense => &[Self::Expense, Self::Both],
            EntryKind::Withdrawal => &[Self::Withdrawal],
        }
    }
}

impl fmt::Display for CategoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CategoryScope {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "withdrawal" => Ok(Self::Withdrawal),
            "both" => Ok(Self::Both),
            other => Err(EngineError::InvalidKind(format!(
                "invalid category scope: {other}"
            ))),
        }
    }
}

impl FromStr for CategoryScope {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.trim().to_lowercase().as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub scope: CategoryScope,
    pub active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub name_norm: String,
    pub scope: String,
    pub active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::entries::Entity")]
    Entries,
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            name: model.name,
            scope: CategoryScope::try_from(model.scope.as_str())?,
            active: model.active,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
