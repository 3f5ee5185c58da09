use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
};

use crate::{
    Entry, EngineError, EntryKind, ResultEngine, Shift, entries, util::local_day_bounds,
};

use super::super::{Engine, with_tx};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u64 = 20;

/// Filters for listing entries. Soft-deleted entries are never returned.
///
/// `date` selects one local calendar day. `from` is inclusive and `to` is
/// exclusive (`[from, to)`), both in UTC; they combine with `date`.
#[derive(Clone, Debug, Default)]
pub struct EntryListFilter {
    pub date: Option<NaiveDate>,
    pub actor_id: Option<String>,
    pub shift: Option<Shift>,
    pub category_id: Option<i64>,
    pub session_id: Option<i64>,
    pub kind: Option<EntryKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn validate_list_filter(filter: &EntryListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidRange(
            "from must be < to".to_string(),
        ));
    }
    Ok(())
}

trait ApplyEntryFilters: QueryFilter + Sized {
    fn apply_entry_filters(self, filter: &EntryListFilter) -> Self;
}

impl<T> ApplyEntryFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_entry_filters(mut self, filter: &EntryListFilter) -> Self {
        self = self.filter(entries::Column::DeletedAt.is_null());

        if let Some(date) = filter.date {
            let (start, end) = local_day_bounds(date);
            self = self
                .filter(entries::Column::EntryDate.gte(start))
                .filter(entries::Column::EntryDate.lt(end));
        }
        if let Some(from) = filter.from {
            self = self.filter(entries::Column::EntryDate.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(entries::Column::EntryDate.lt(to));
        }
        if let Some(actor_id) = &filter.actor_id {
            self = self.filter(entries::Column::CreatedBy.eq(actor_id.clone()));
        }
        if let Some(shift) = filter.shift {
            self = self.filter(entries::Column::Shift.eq(shift.as_str()));
        }
        if let Some(category_id) = filter.category_id {
            self = self.filter(entries::Column::CategoryId.eq(category_id));
        }
        if let Some(session_id) = filter.session_id {
            self = self.filter(entries::Column::SessionId.eq(session_id));
        }
        if let Some(kind) = filter.kind {
            self = self.filter(entries::Column::Kind.eq(kind.as_str()));
        }

        self
    }
}

impl Engine {
    /// Lists live entries, newest first by `(created_at DESC, id DESC)`.
    ///
    /// Returns the requested page and the total number of matching entries.
    /// A `limit` of zero falls back to [`DEFAULT_PAGE_LIMIT`].
    pub async fn list_entries(
        &self,
        filter: &EntryListFilter,
        limit: u64,
        offset: u64,
    ) -> ResultEngine<(Vec<Entry>, u64)> {
        validate_list_filter(filter)?;
        let limit = if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit };

        with_tx!(self, |db_tx| {
            let total = entries::Entity::find()
                .apply_entry_filters(filter)
                .count(&db_tx)
                .await?;

            let items = entries::Entity::find()
                .apply_entry_filters(filter)
                .order_by_desc(entries::Column::CreatedAt)
                .order_by_desc(entries::Column::Id)
                .offset(offset)
                .limit(limit)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Entry::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            Ok((items, total))
        })
    }

    /// The `limit` most recent live entries across all sessions.
    pub async fn last_entries(&self, limit: u64) -> ResultEngine<Vec<Entry>> {
        let (items, _total) = self
            .list_entries(&EntryListFilter::default(), limit, 0)
            .await?;
        Ok(items)
    }

    /// Fetches one entry, deleted or not.
    pub async fn entry(&self, entry_id: i64) -> ResultEngine<Entry> {
        with_tx!(self, |db_tx| {
            let model = entries::Entity::find_by_id(entry_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("entry {entry_id} not exists")))?;
            Entry::try_from(model)
        })
    }
}
