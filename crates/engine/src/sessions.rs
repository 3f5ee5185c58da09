//! Cash-box sessions.
//!
//! A `Session` is one open/close cycle of the physical cash box for one actor
//! and one shift. Entries can only be recorded while the session is active;
//! closing freezes `closing_balance` and is terminal.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{EngineError, MoneyCents, ResultEngine};

/// Time-of-day window a session (and its entries) belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shift {
    #[serde(rename = "M")]
    Morning,
    #[serde(rename = "T")]
    Afternoon,
}

impl Shift {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "M",
            Self::Afternoon => "T",
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Shift {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "M" | "m" => Ok(Self::Morning),
            "T" | "t" => Ok(Self::Afternoon),
            other => Err(EngineError::InvalidShift(format!(
                "expected M or T, got {other}"
            ))),
        }
    }
}

impl FromStr for Shift {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.trim())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub actor_id: String,
    pub shift: Shift,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub opening_balance: MoneyCents,
    pub closing_balance: Option<MoneyCents>,
    pub business_date: NaiveDate,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.active
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub actor_id: String,
    pub shift: String,
    pub opened_at: DateTimeUtc,
    pub closed_at: Option<DateTimeUtc>,
    pub active: bool,
    pub opening_balance_minor: i64,
    pub closing_balance_minor: Option<i64>,
    pub business_date: Date,
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

impl TryFrom<Model> for Session {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            actor_id: model.actor_id,
            shift: Shift::try_from(model.shift.as_str())?,
            opened_at: model.opened_at,
            closed_at: model.closed_at,
            active: model.active,
            opening_balance: MoneyCents::new(model.opening_balance_minor),
            closing_balance: model.closing_balance_minor.map(MoneyCents::new),
            business_date: model.business_date,
        })
    }
}
