use std::{future::Future, time::Duration};

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{EngineError, ResultEngine};

mod balances;
mod categories;
mod entries;
mod sequence;
mod sessions;

pub use balances::{BalanceSnapshot, BalanceTotals, SessionBalanceFilter};
pub use entries::{DEFAULT_PAGE_LIMIT, EntryListFilter};

/// Run a block inside a DB transaction, committing on success and rolling back
/// on error.
///
/// The whole unit (begin, body, commit) is bounded by the engine's operation
/// timeout. An `Err` or an expired deadline drops the open transaction, which
/// rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let work = async {
            let $tx = $self.database.begin().await?;
            let result: $crate::ResultEngine<_> = $body;
            let value = result?;
            $tx.commit().await?;
            Ok::<_, $crate::EngineError>(value)
        };
        $self.within_deadline(work).await
    }};
}

/// Like `with_tx!`, but first takes the engine's write lock.
///
/// SQLite opens a deferred transaction and upgrades it on the first write;
/// two pooled connections upgrading at once fail with "database is locked"
/// instead of waiting. Queueing writers on the lock lets every caller run to
/// completion. Waiting for the lock counts against the operation deadline.
macro_rules! with_write_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let work = async {
            let _write_guard = $self.write_lock.lock().await;
            let $tx = $self.database.begin().await?;
            let result: $crate::ResultEngine<_> = $body;
            let value = result?;
            $tx.commit().await?;
            Ok::<_, $crate::EngineError>(value)
        };
        $self.within_deadline(work).await
    }};
}

pub(crate) use with_tx;
pub(crate) use with_write_tx;

/// How a new session's opening balance is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpeningBalancePolicy {
    /// Every session starts from zero.
    #[default]
    Zero,
    /// Start from the closing balance of the previous session.
    CarryForward,
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    opening_balance: OpeningBalancePolicy,
    operation_timeout: Option<Duration>,
    write_lock: Mutex<()>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn opening_balance_policy(&self) -> OpeningBalancePolicy {
        self.opening_balance
    }

    async fn within_deadline<T, F>(&self, work: F) -> ResultEngine<T>
    where
        F: Future<Output = ResultEngine<T>>,
    {
        let Some(limit) = self.operation_timeout else {
            return work.await;
        };
        match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(?limit, "ledger operation exceeded its deadline, rolled back");
                Err(EngineError::Timeout(format!(
                    "operation exceeded {}ms",
                    limit.as_millis()
                )))
            }
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    opening_balance: OpeningBalancePolicy,
    operation_timeout: Option<Duration>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    pub fn opening_balance(mut self, policy: OpeningBalancePolicy) -> EngineBuilder {
        self.opening_balance = policy;
        self
    }

    /// Upper bound for every public operation, transaction included.
    pub fn operation_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if self.operation_timeout.is_some_and(|t| t.is_zero()) {
            return Err(EngineError::InvalidConfig(
                "operation timeout must be > 0".to_string(),
            ));
        }
        Ok(Engine {
            database: self.database,
            opening_balance: self.opening_balance,
            operation_timeout: self.operation_timeout,
            write_lock: Mutex::new(()),
        })
    }
}
