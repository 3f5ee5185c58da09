//! The module contains the error the engine can throw.
//!
//! Every variant belongs to one [`ErrorKind`], which is what callers (CLI,
//! HTTP layers) translate into their own responses:
//!
//! - validation errors are the caller's fault and are never retried;
//! - [`KeyNotFound`] and [`Forbidden`] report missing rows and ownership
//!   violations;
//! - conflicts report a state that does not allow the operation
//!   ([`NoOpenSession`], [`AlreadyClosed`], ...);
//! - store errors wrap the database and deadline failures.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`NoOpenSession`]: EngineError::NoOpenSession
//!  [`AlreadyClosed`]: EngineError::AlreadyClosed
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid shift: {0}")]
    InvalidShift(String),
    #[error("Invalid entry kind: {0}")]
    InvalidKind(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid range: {0}")]
    InvalidRange(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Balance out of range: {0}")]
    Overflow(String),
    #[error("Category mismatch: {0}")]
    CategoryMismatch(String),
    #[error("Empty batch: {0}")]
    EmptyBatch(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("No open session: {0}")]
    NoOpenSession(String),
    #[error("Session already closed: {0}")]
    AlreadyClosed(String),
    #[error("Entry already deleted: {0}")]
    AlreadyDeleted(String),
    #[error("Session {session_id} is still open; confirm to close it")]
    SessionAlreadyOpen { session_id: i64 },
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),
    #[error("Operation timed out: {0}")]
    Timeout(String),
    #[error(transparent)]
    Database(DbErr),
}

/// Coarse classification of [`EngineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    Store,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_)
            | Self::InvalidShift(_)
            | Self::InvalidKind(_)
            | Self::InvalidName(_)
            | Self::InvalidRange(_)
            | Self::InvalidConfig(_)
            | Self::Overflow(_)
            | Self::CategoryMismatch(_)
            | Self::EmptyBatch(_) => ErrorKind::Validation,
            Self::KeyNotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::ExistingKey(_)
            | Self::NoOpenSession(_)
            | Self::AlreadyClosed(_)
            | Self::AlreadyDeleted(_)
            | Self::SessionAlreadyOpen { .. }
            | Self::Conflict(_) => ErrorKind::Conflict,
            Self::Timeout(_) | Self::Database(_) => ErrorKind::Store,
        }
    }

    /// Whether repeating the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_) | Self::Timeout(_) | Self::Database(_)
        )
    }
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::Conflict(detail),
            _ => Self::Database(err),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidShift(a), Self::InvalidShift(b)) => a == b,
            (Self::InvalidKind(a), Self::InvalidKind(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidRange(a), Self::InvalidRange(b)) => a == b,
            (Self::InvalidConfig(a), Self::InvalidConfig(b)) => a == b,
            (Self::Overflow(a), Self::Overflow(b)) => a == b,
            (Self::CategoryMismatch(a), Self::CategoryMismatch(b)) => a == b,
            (Self::EmptyBatch(a), Self::EmptyBatch(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::NoOpenSession(a), Self::NoOpenSession(b)) => a == b,
            (Self::AlreadyClosed(a), Self::AlreadyClosed(b)) => a == b,
            (Self::AlreadyDeleted(a), Self::AlreadyDeleted(b)) => a == b,
            (
                Self::SessionAlreadyOpen { session_id: a },
                Self::SessionAlreadyOpen { session_id: b },
            ) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
