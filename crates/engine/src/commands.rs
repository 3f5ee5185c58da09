//! Command structs for engine operations.
//!
//! These types group parameters for write operations (open session, record
//! entries, update entries), keeping call sites readable and avoiding long
//! argument lists.

use crate::{EntryKind, MoneyCents, Shift};

/// What `open_session` does when the latest session is still active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IfOpen {
    /// Close the active session (freezing its balance) and open the new one.
    #[default]
    CloseIt,
    /// Fail with `EngineError::SessionAlreadyOpen` and change nothing.
    RequireConfirmation,
}

/// Open a new session.
#[derive(Clone, Debug)]
pub struct OpenSessionCmd {
    pub actor_id: String,
    pub shift: Shift,
    pub if_open: IfOpen,
}

impl OpenSessionCmd {
    #[must_use]
    pub fn new(actor_id: impl Into<String>, shift: Shift) -> Self {
        Self {
            actor_id: actor_id.into(),
            shift,
            if_open: IfOpen::default(),
        }
    }

    /// Refuse to implicitly close a session that is still open.
    #[must_use]
    pub fn require_confirmation(mut self) -> Self {
        self.if_open = IfOpen::RequireConfirmation;
        self
    }

    #[must_use]
    pub fn if_open(mut self, if_open: IfOpen) -> Self {
        self.if_open = if_open;
        self
    }
}

/// One item of a `create_entries` batch.
#[derive(Clone, Debug)]
pub struct NewEntry {
    pub kind: EntryKind,
    pub amount: MoneyCents,
    pub shift: Shift,
    pub category_id: i64,
    pub details: Option<String>,
}

impl NewEntry {
    #[must_use]
    pub fn new(kind: EntryKind, amount: MoneyCents, shift: Shift, category_id: i64) -> Self {
        Self {
            kind,
            amount,
            shift,
            category_id,
            details: None,
        }
    }

    #[must_use]
    pub fn income(amount: MoneyCents, shift: Shift, category_id: i64) -> Self {
        Self::new(EntryKind::Income, amount, shift, category_id)
    }

    #[must_use]
    pub fn expense(amount: MoneyCents, shift: Shift, category_id: i64) -> Self {
        Self::new(EntryKind::Expense, amount, shift, category_id)
    }

    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Change the secondary fields of an existing entry.
#[derive(Clone, Debug)]
pub struct UpdateEntryCmd {
    pub entry_id: i64,
    pub actor_id: String,
    pub category_id: Option<i64>,
    /// `Some(None)` clears the details.
    pub details: Option<Option<String>>,
}

impl UpdateEntryCmd {
    #[must_use]
    pub fn new(entry_id: i64, actor_id: impl Into<String>) -> Self {
        Self {
            entry_id,
            actor_id: actor_id.into(),
            category_id: None,
            details: None,
        }
    }

    #[must_use]
    pub fn category_id(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn details(mut self, details: Option<String>) -> Self {
        self.details = Some(details);
        self
    }

    pub(crate) fn is_noop(&self) -> bool {
        self.category_id.is_none() && self.details.is_none()
    }
}
