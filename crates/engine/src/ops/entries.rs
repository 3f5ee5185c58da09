use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*,
};

use crate::{
    Entry, EngineError, ResultEngine, Shift,
    commands::{NewEntry, UpdateEntryCmd},
    entries::{self, NewEntryRow},
    sessions,
    util::{normalize_optional_text, require_actor},
};

use super::{Engine, with_write_tx};

mod list;

pub use list::{DEFAULT_PAGE_LIMIT, EntryListFilter};

impl Engine {
    /// Records a batch of entries in one transaction.
    ///
    /// Each entry goes to the actor's open session for its shift. If any item
    /// fails (no open session, bad category, invalid amount) nothing is
    /// written.
    pub async fn create_entries(
        &self,
        actor_id: &str,
        items: Vec<NewEntry>,
    ) -> ResultEngine<Vec<Entry>> {
        let actor_id = require_actor(actor_id)?;
        if items.is_empty() {
            return Err(EngineError::EmptyBatch(
                "at least one entry is required".to_string(),
            ));
        }
        for item in &items {
            if !item.amount.is_positive() {
                return Err(EngineError::InvalidAmount(format!(
                    "amount must be > 0, got {}",
                    item.amount
                )));
            }
        }

        with_write_tx!(self, |db_tx| {
            let now = Utc::now();
            let mut sessions_by_shift: HashMap<Shift, i64> = HashMap::new();
            let mut created = Vec::with_capacity(items.len());

            for item in &items {
                let session_id = match sessions_by_shift.get(&item.shift) {
                    Some(id) => *id,
                    None => {
                        let id = self
                            .require_open_session_for(&db_tx, actor_id, item.shift)
                            .await?;
                        sessions_by_shift.insert(item.shift, id);
                        id
                    }
                };
                self.require_category_for(&db_tx, item.category_id, item.kind)
                    .await?;
                let reference = self.next_reference(&db_tx, actor_id, now).await?;

                let row = NewEntryRow {
                    reference,
                    kind: item.kind,
                    entry_date: now,
                    amount: item.amount,
                    shift: item.shift,
                    category_id: item.category_id,
                    details: normalize_optional_text(item.details.as_deref()),
                    created_by: actor_id.to_string(),
                    session_id,
                };
                let model = entries::ActiveModel::from(row).insert(&db_tx).await?;
                created.push(Entry::try_from(model)?);
            }

            tracing::info!(actor_id, count = created.len(), "entries recorded");
            Ok(created)
        })
    }

    /// Soft-deletes an entry. It stays in storage but no longer counts in
    /// lists or balances.
    pub async fn soft_delete_entry(&self, entry_id: i64, actor_id: &str) -> ResultEngine<()> {
        let actor_id = require_actor(actor_id)?;
        with_write_tx!(self, |db_tx| {
            let model = require_entry(&db_tx, entry_id).await?;
            if model.deleted_at.is_some() {
                return Err(EngineError::AlreadyDeleted(format!(
                    "entry {entry_id} already deleted"
                )));
            }

            let active = entries::ActiveModel {
                id: ActiveValue::Set(entry_id),
                deleted_by: ActiveValue::Set(Some(actor_id.to_string())),
                deleted_at: ActiveValue::Set(Some(Utc::now())),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            tracing::info!(entry_id, actor_id, reference = %model.reference, "entry deleted");
            Ok(())
        })
    }

    /// Changes the category and/or details of a live entry.
    ///
    /// Amount, kind and session are immutable; a wrong amount is fixed by
    /// deleting the entry and recording a new one.
    pub async fn update_entry(&self, cmd: UpdateEntryCmd) -> ResultEngine<Entry> {
        let actor_id = require_actor(&cmd.actor_id)?.to_string();
        with_write_tx!(self, |db_tx| {
            let model = require_entry(&db_tx, cmd.entry_id).await?;
            if model.deleted_at.is_some() {
                return Err(EngineError::AlreadyDeleted(format!(
                    "entry {} is deleted",
                    cmd.entry_id
                )));
            }
            if cmd.is_noop() {
                return Entry::try_from(model);
            }

            let current = Entry::try_from(model)?;
            let mut active = entries::ActiveModel {
                id: ActiveValue::Set(current.id),
                updated_by: ActiveValue::Set(Some(actor_id.clone())),
                updated_at: ActiveValue::Set(Some(Utc::now())),
                ..Default::default()
            };
            if let Some(category_id) = cmd.category_id {
                self.require_category_for(&db_tx, category_id, current.kind)
                    .await?;
                active.category_id = ActiveValue::Set(category_id);
            }
            if let Some(details) = &cmd.details {
                active.details = ActiveValue::Set(normalize_optional_text(details.as_deref()));
            }

            let model = active.update(&db_tx).await?;
            tracing::info!(entry_id = model.id, actor_id = %actor_id, "entry updated");
            Entry::try_from(model)
        })
    }

    /// Id of the active session owned by `actor_id` for `shift`.
    async fn require_open_session_for(
        &self,
        db_tx: &DatabaseTransaction,
        actor_id: &str,
        shift: Shift,
    ) -> ResultEngine<i64> {
        sessions::Entity::find()
            .filter(sessions::Column::ActorId.eq(actor_id))
            .filter(sessions::Column::Shift.eq(shift.as_str()))
            .filter(sessions::Column::Active.eq(true))
            .one(db_tx)
            .await?
            .map(|model| model.id)
            .ok_or_else(|| {
                EngineError::NoOpenSession(format!(
                    "no open session for actor '{actor_id}' in shift {shift}"
                ))
            })
    }
}

async fn require_entry(db_tx: &DatabaseTransaction, entry_id: i64) -> ResultEngine<entries::Model> {
    entries::Entity::find_by_id(entry_id)
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("entry {entry_id} not exists")))
}
