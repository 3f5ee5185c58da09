use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, EntityTrait,
    sea_query::{Expr, OnConflict},
};

use crate::{
    EngineError, ResultEngine, entry_sequences,
    util::{day_stamp, local_date},
};

use super::Engine;

impl Engine {
    /// Allocates the next entry reference, `YYYYMMDD-<counter>-<actor>`.
    ///
    /// The counter lives in `entry_sequences` and is bumped with a single
    /// upsert inside the caller's transaction, so two concurrent writers can
    /// never observe the same value: the upsert holds the row (or, on SQLite,
    /// the database) write lock until the transaction ends.
    pub(super) async fn next_reference(
        &self,
        db_tx: &DatabaseTransaction,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<String> {
        let day = day_stamp(local_date(now));

        let seed = entry_sequences::ActiveModel {
            day: ActiveValue::Set(day.clone()),
            last_value: ActiveValue::Set(1),
        };
        entry_sequences::Entity::insert(seed)
            .on_conflict(
                OnConflict::column(entry_sequences::Column::Day)
                    .value(
                        entry_sequences::Column::LastValue,
                        Expr::col(entry_sequences::Column::LastValue).add(1),
                    )
                    .to_owned(),
            )
            .exec_without_returning(db_tx)
            .await?;

        let counter = entry_sequences::Entity::find_by_id(day.clone())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("entry sequence {day}")))?
            .last_value;

        let reference = format_reference(&day, counter, actor_id);
        tracing::debug!(%reference, "allocated entry reference");
        Ok(reference)
    }
}

fn format_reference(day: &str, counter: i64, actor_id: &str) -> String {
    format!("{day}-{counter}-{actor_id}")
}
