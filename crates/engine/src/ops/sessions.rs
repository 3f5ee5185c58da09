use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, EntryKind, MoneyCents, ResultEngine, Session,
    commands::{IfOpen, OpenSessionCmd},
    entries::{self, NewEntryRow},
    sessions,
    util::{local_date, require_actor},
};

use super::{Engine, OpeningBalancePolicy, with_tx, with_write_tx};

/// Details stamped on the entry recorded by `close_session_with_withdrawal`.
const CLOSING_WITHDRAWAL_DETAILS: &str = "Cash withdrawal at session close";

impl Engine {
    /// Opens a new session for `cmd.actor_id` and `cmd.shift`.
    ///
    /// Runs under the engine's write lock, so the latest session system-wide
    /// cannot change between the read and the insert. If it is still
    /// active it is either closed first (`IfOpen::CloseIt`) or the call fails
    /// with `EngineError::SessionAlreadyOpen` (`IfOpen::RequireConfirmation`).
    pub async fn open_session(&self, cmd: OpenSessionCmd) -> ResultEngine<Session> {
        let actor_id = require_actor(&cmd.actor_id)?.to_string();

        with_write_tx!(self, |db_tx| {
            let now = Utc::now();
            let latest = sessions::Entity::find()
                .order_by_desc(sessions::Column::Id)
                .one(&db_tx)
                .await?;

            let mut previous_closing = None;
            if let Some(latest) = latest {
                if latest.active {
                    if cmd.if_open == IfOpen::RequireConfirmation {
                        return Err(EngineError::SessionAlreadyOpen {
                            session_id: latest.id,
                        });
                    }
                    let closed_id = latest.id;
                    let closed_by = latest.actor_id.clone();
                    let closing = self.freeze_session(&db_tx, latest).await?;
                    tracing::info!(
                        session_id = closed_id,
                        owner = %closed_by,
                        %closing,
                        "active session closed implicitly by a new open"
                    );
                    previous_closing = Some(closing);
                } else {
                    previous_closing = latest.closing_balance_minor.map(MoneyCents::new);
                }
            }

            let opening = match self.opening_balance_policy() {
                OpeningBalancePolicy::Zero => MoneyCents::ZERO,
                OpeningBalancePolicy::CarryForward => previous_closing.unwrap_or_default(),
            };

            let model = sessions::ActiveModel {
                id: ActiveValue::NotSet,
                actor_id: ActiveValue::Set(actor_id.clone()),
                shift: ActiveValue::Set(cmd.shift.as_str().to_string()),
                opened_at: ActiveValue::Set(now),
                closed_at: ActiveValue::Set(None),
                active: ActiveValue::Set(true),
                opening_balance_minor: ActiveValue::Set(opening.cents()),
                closing_balance_minor: ActiveValue::Set(None),
                business_date: ActiveValue::Set(local_date(now)),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(
                session_id = model.id,
                actor_id = %actor_id,
                shift = %cmd.shift,
                %opening,
                "session opened"
            );
            Session::try_from(model)
        })
    }

    /// Closes an open session owned by `actor_id`, freezing its balance.
    pub async fn close_session(&self, session_id: i64, actor_id: &str) -> ResultEngine<Session> {
        let actor_id = require_actor(actor_id)?;
        with_write_tx!(self, |db_tx| {
            let model = self
                .require_closable_session(&db_tx, session_id, actor_id)
                .await?;
            let closing = self.freeze_session(&db_tx, model).await?;
            tracing::info!(session_id, actor_id, %closing, "session closed");
            self.load_session(&db_tx, session_id).await
        })
    }

    /// Records a cash withdrawal and closes the session, as one unit.
    ///
    /// A zero `amount` is a plain close. The withdrawal entry is booked under
    /// the withdrawal category (provisioned on first use), in the session's
    /// shift, and lowers the frozen closing balance.
    pub async fn close_session_with_withdrawal(
        &self,
        session_id: i64,
        actor_id: &str,
        amount: MoneyCents,
    ) -> ResultEngine<Session> {
        let actor_id = require_actor(actor_id)?;
        if amount.is_negative() {
            return Err(EngineError::InvalidAmount(format!(
                "withdrawal must be >= 0, got {amount}"
            )));
        }

        with_write_tx!(self, |db_tx| {
            let model = self
                .require_closable_session(&db_tx, session_id, actor_id)
                .await?;

            if amount.is_positive() {
                let session = Session::try_from(model.clone())?;
                let category_id = self.resolve_withdrawal_category(&db_tx, actor_id).await?;
                let now = Utc::now();
                let reference = self.next_reference(&db_tx, actor_id, now).await?;
                let row = NewEntryRow {
                    reference,
                    kind: EntryKind::Withdrawal,
                    entry_date: now,
                    amount,
                    shift: session.shift,
                    category_id,
                    details: Some(CLOSING_WITHDRAWAL_DETAILS.to_string()),
                    created_by: actor_id.to_string(),
                    session_id,
                };
                let entry = entries::ActiveModel::from(row).insert(&db_tx).await?;
                tracing::info!(
                    session_id,
                    entry_id = entry.id,
                    reference = %entry.reference,
                    %amount,
                    "withdrawal recorded at close"
                );
            }

            let closing = self.freeze_session(&db_tx, model).await?;
            tracing::info!(session_id, actor_id, %closing, "session closed");
            self.load_session(&db_tx, session_id).await
        })
    }

    /// Whether the most recent session is still active.
    pub async fn is_last_session_open(&self) -> ResultEngine<bool> {
        Ok(self.last_session().await?.is_some_and(|s| s.active))
    }

    /// The most recent session, open or closed.
    pub async fn last_session(&self) -> ResultEngine<Option<Session>> {
        with_tx!(self, |db_tx| {
            sessions::Entity::find()
                .order_by_desc(sessions::Column::Id)
                .one(&db_tx)
                .await?
                .map(Session::try_from)
                .transpose()
        })
    }

    pub async fn session(&self, session_id: i64) -> ResultEngine<Session> {
        with_tx!(self, |db_tx| self.load_session(&db_tx, session_id).await)
    }

    /// Loads a session and checks `actor_id` may close it.
    async fn require_closable_session(
        &self,
        db_tx: &DatabaseTransaction,
        session_id: i64,
        actor_id: &str,
    ) -> ResultEngine<sessions::Model> {
        let model = sessions::Entity::find_by_id(session_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("session {session_id} not exists")))?;

        if model.actor_id != actor_id {
            tracing::warn!(session_id, actor_id, owner = %model.actor_id, "close rejected: not the owner");
            return Err(EngineError::Forbidden(format!(
                "session {session_id} belongs to another actor"
            )));
        }
        if !model.active || model.closed_at.is_some() {
            tracing::warn!(session_id, actor_id, "close rejected: already closed");
            return Err(EngineError::AlreadyClosed(format!(
                "session {session_id} is already closed"
            )));
        }
        Ok(model)
    }

    /// Stamps `closed_at`, clears `active` and stores the closing balance
    /// computed from the session's live entries.
    async fn freeze_session(
        &self,
        db_tx: &DatabaseTransaction,
        model: sessions::Model,
    ) -> ResultEngine<MoneyCents> {
        let opening = MoneyCents::new(model.opening_balance_minor);
        let closing = self.compute_balance(db_tx, model.id, opening).await?;

        let active = sessions::ActiveModel {
            id: ActiveValue::Set(model.id),
            closed_at: ActiveValue::Set(Some(Utc::now())),
            active: ActiveValue::Set(false),
            closing_balance_minor: ActiveValue::Set(Some(closing.cents())),
            ..Default::default()
        };
        active.update(db_tx).await?;
        Ok(closing)
    }

    async fn load_session(
        &self,
        db_tx: &DatabaseTransaction,
        session_id: i64,
    ) -> ResultEngine<Session> {
        let model = sessions::Entity::find_by_id(session_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("session {session_id} not exists")))?;
        Session::try_from(model)
    }
}
