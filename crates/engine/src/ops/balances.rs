use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, EntryKind, MoneyCents, ResultEngine, Session, Shift, entries, sessions,
};

use super::{Engine, with_tx};

/// Per-kind sums over the live (non-deleted) entries of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceTotals {
    pub income: MoneyCents,
    pub expense: MoneyCents,
    pub withdrawal: MoneyCents,
}

impl BalanceTotals {
    /// `opening + income - expense - withdrawal`, failing with
    /// `EngineError::Overflow` when the result does not fit in `i64` cents.
    pub fn apply_to(&self, opening: MoneyCents) -> ResultEngine<MoneyCents> {
        opening
            .checked_add(self.income)
            .and_then(|v| v.checked_sub(self.expense))
            .and_then(|v| v.checked_sub(self.withdrawal))
            .ok_or_else(|| {
                EngineError::Overflow(format!(
                    "opening {opening} with totals {self:?} exceeds the cents range"
                ))
            })
    }

    fn add(&mut self, kind: EntryKind, amount: MoneyCents) -> ResultEngine<()> {
        let slot = match kind {
            EntryKind::Income => &mut self.income,
            EntryKind::Expense => &mut self.expense,
            EntryKind::Withdrawal => &mut self.withdrawal,
        };
        *slot = slot
            .checked_add(amount)
            .ok_or_else(|| EngineError::Overflow(format!("{kind} total exceeds the cents range")))?;
        Ok(())
    }
}

/// Balance view of one session.
///
/// `balance` is the frozen closing balance for closed sessions and a live
/// computation for the open one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub session: Session,
    pub totals: BalanceTotals,
    pub balance: MoneyCents,
}

/// Filters for `session_balances`.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), on the session
/// business date.
#[derive(Clone, Debug, Default)]
pub struct SessionBalanceFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub shift: Option<Shift>,
    /// Only sessions whose balance is below zero.
    pub negative_only: bool,
}

impl Engine {
    /// Sums the live entries of a session by kind with one aggregate query.
    ///
    /// Runs on the caller's transaction so a close sees exactly the entries
    /// it is about to freeze.
    pub(super) async fn compute_totals(
        &self,
        db_tx: &DatabaseTransaction,
        session_id: i64,
    ) -> ResultEngine<BalanceTotals> {
        let rows: Vec<(String, Option<i64>)> = entries::Entity::find()
            .select_only()
            .column(entries::Column::Kind)
            .column_as(entries::Column::AmountMinor.sum(), "total")
            .filter(entries::Column::SessionId.eq(session_id))
            .filter(entries::Column::DeletedAt.is_null())
            .group_by(entries::Column::Kind)
            .into_tuple()
            .all(db_tx)
            .await?;

        let mut totals = BalanceTotals::default();
        for (kind, total) in rows {
            let kind = EntryKind::try_from(kind.as_str())?;
            totals.add(kind, MoneyCents::new(total.unwrap_or_default()))?;
        }
        Ok(totals)
    }

    /// Current balance of a session: opening balance adjusted by its live
    /// entries.
    pub(super) async fn compute_balance(
        &self,
        db_tx: &DatabaseTransaction,
        session_id: i64,
        opening: MoneyCents,
    ) -> ResultEngine<MoneyCents> {
        let totals = self.compute_totals(db_tx, session_id).await?;
        totals.apply_to(opening)
    }

    async fn snapshot(
        &self,
        db_tx: &DatabaseTransaction,
        model: sessions::Model,
    ) -> ResultEngine<BalanceSnapshot> {
        let session = Session::try_from(model)?;
        let totals = self.compute_totals(db_tx, session.id).await?;
        let balance = match (session.active, session.closing_balance) {
            (false, Some(frozen)) => frozen,
            _ => totals.apply_to(session.opening_balance)?,
        };
        Ok(BalanceSnapshot {
            session,
            totals,
            balance,
        })
    }

    /// Balance snapshot of a given session.
    pub async fn session_balance(&self, session_id: i64) -> ResultEngine<BalanceSnapshot> {
        with_tx!(self, |db_tx| {
            let model = sessions::Entity::find_by_id(session_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound(format!("session {session_id} not exists"))
                })?;
            self.snapshot(&db_tx, model).await
        })
    }

    /// Balance snapshot of the most recent session, open or closed.
    pub async fn latest_session_balance(&self) -> ResultEngine<BalanceSnapshot> {
        with_tx!(self, |db_tx| {
            let model = sessions::Entity::find()
                .order_by_desc(sessions::Column::Id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("no session recorded".to_string()))?;
            self.snapshot(&db_tx, model).await
        })
    }

    /// Balance snapshots for every session matching `filter`, newest first.
    ///
    /// Totals for all sessions are loaded with a single grouped query.
    pub async fn session_balances(
        &self,
        filter: &SessionBalanceFilter,
    ) -> ResultEngine<Vec<BalanceSnapshot>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to)
            && from >= to
        {
            return Err(EngineError::InvalidRange(
                "from must be < to".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let mut query = sessions::Entity::find().order_by_desc(sessions::Column::Id);
            if let Some(from) = filter.from {
                query = query.filter(sessions::Column::BusinessDate.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(sessions::Column::BusinessDate.lt(to));
            }
            if let Some(shift) = filter.shift {
                query = query.filter(sessions::Column::Shift.eq(shift.as_str()));
            }
            let session_models = query.all(&db_tx).await?;
            let ids: Vec<i64> = session_models.iter().map(|m| m.id).collect();

            let rows: Vec<(i64, String, Option<i64>)> = if ids.is_empty() {
                Vec::new()
            } else {
                entries::Entity::find()
                    .select_only()
                    .column(entries::Column::SessionId)
                    .column(entries::Column::Kind)
                    .column_as(entries::Column::AmountMinor.sum(), "total")
                    .filter(entries::Column::SessionId.is_in(ids))
                    .filter(entries::Column::DeletedAt.is_null())
                    .group_by(entries::Column::SessionId)
                    .group_by(entries::Column::Kind)
                    .into_tuple()
                    .all(&db_tx)
                    .await?
            };

            let mut totals_by_session: HashMap<i64, BalanceTotals> = HashMap::new();
            for (session_id, kind, total) in rows {
                let kind = EntryKind::try_from(kind.as_str())?;
                totals_by_session
                    .entry(session_id)
                    .or_default()
                    .add(kind, MoneyCents::new(total.unwrap_or_default()))?;
            }

            let mut out = Vec::with_capacity(session_models.len());
            for model in session_models {
                let session = Session::try_from(model)?;
                let totals = totals_by_session
                    .get(&session.id)
                    .copied()
                    .unwrap_or_default();
                let balance = match (session.active, session.closing_balance) {
                    (false, Some(frozen)) => frozen,
                    _ => totals.apply_to(session.opening_balance)?,
                };
                if filter.negative_only && !balance.is_negative() {
                    continue;
                }
                out.push(BalanceSnapshot {
                    session,
                    totals,
                    balance,
                });
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_apply_signs_by_kind() {
        let mut totals = BalanceTotals::default();
        totals.add(EntryKind::Income, MoneyCents::new(10_000)).unwrap();
        totals.add(EntryKind::Expense, MoneyCents::new(3_000)).unwrap();
        totals.add(EntryKind::Withdrawal, MoneyCents::new(5_000)).unwrap();
        totals.add(EntryKind::Income, MoneyCents::new(500)).unwrap();
        assert_eq!(
            totals.apply_to(MoneyCents::new(1_000)).unwrap(),
            MoneyCents::new(3_500)
        );
    }

    #[test]
    fn totals_can_go_negative() {
        let totals = BalanceTotals {
            expense: MoneyCents::new(200),
            ..Default::default()
        };
        assert_eq!(
            totals.apply_to(MoneyCents::ZERO).unwrap(),
            MoneyCents::new(-200)
        );
    }

    #[test]
    fn out_of_range_balance_is_an_error() {
        let totals = BalanceTotals {
            income: MoneyCents::new(1),
            ..Default::default()
        };
        let err = totals.apply_to(MoneyCents::new(i64::MAX)).unwrap_err();
        assert!(matches!(err, EngineError::Overflow(_)));

        let totals = BalanceTotals {
            withdrawal: MoneyCents::new(i64::MAX),
            ..Default::default()
        };
        assert!(totals.apply_to(MoneyCents::new(-2)).is_err());

        let mut totals = BalanceTotals {
            expense: MoneyCents::new(i64::MAX),
            ..Default::default()
        };
        assert!(totals.add(EntryKind::Expense, MoneyCents::new(1)).is_err());
    }
}
