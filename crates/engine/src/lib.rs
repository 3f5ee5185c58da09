//! Session ledger engine for a cash register.
//!
//! A session is one open/close cycle of the cash box. Entries (income,
//! expense, withdrawal) are recorded against the open session and the
//! session balance is derived from them. At most one session is active at
//! any time and closing one freezes its balance.
//!
//! Every public operation on [`Engine`] runs in a single database
//! transaction: it either commits completely or leaves no trace.

pub use categories::{Category, CategoryScope};
pub use commands::{IfOpen, NewEntry, OpenSessionCmd, UpdateEntryCmd};
pub use entries::{Entry, EntryKind};
pub use error::{EngineError, ErrorKind};
pub use money::MoneyCents;
pub use ops::{
    BalanceSnapshot, BalanceTotals, DEFAULT_PAGE_LIMIT, Engine, EngineBuilder, EntryListFilter,
    OpeningBalancePolicy, SessionBalanceFilter,
};
pub use sessions::{Session, Shift};

mod categories;
mod commands;
mod entries;
mod entry_sequences;
mod error;
mod money;
mod ops;
mod sessions;
mod util;

pub(crate) type ResultEngine<T> = Result<T, EngineError>;
