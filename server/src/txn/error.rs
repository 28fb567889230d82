//! Error taxonomy for the transaction lifecycle manager.
//!
//! Every failure a caller can observe falls into one of four kinds: the pool
//! could not hand out a connection, a statement failed on the wire, the
//! referenced transaction has no live registry entry, or the query template
//! could not be rendered. Statement failures carry a fatal flag that decides
//! whether the connection goes back to the pool or is destroyed.

use crate::txn::format::FormatError;
use crate::types::TxnId;
use thiserror::Error;

/// Connection acquisition failed: the pool is exhausted, closed, or the
/// underlying connect attempt errored. Nothing was registered; the caller may
/// simply retry `begin`.
#[derive(Debug, Error)]
#[error("failed to acquire a pooled connection: {message}")]
pub struct AcquireError {
    pub message: String,
    #[source]
    pub source: Option<sqlx::Error>,
}

impl AcquireError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }
}

impl From<sqlx::Error> for AcquireError {
    fn from(err: sqlx::Error) -> Self {
        Self {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// A SQL statement failed. `fatal` marks connection-level failures (broken
/// socket, protocol desync) after which the connection must be destroyed
/// rather than released for reuse.
#[derive(Debug, Error)]
#[error("statement failed: {message}")]
pub struct StatementError {
    pub message: String,
    pub fatal: bool,
    #[source]
    pub source: Option<sqlx::Error>,
}

impl StatementError {
    pub fn new(message: impl Into<String>, fatal: bool) -> Self {
        Self {
            message: message.into(),
            fatal,
            source: None,
        }
    }

    /// Error reported when a statement is issued against a transaction whose
    /// connection was already destroyed by an earlier fatal failure.
    pub fn connection_lost() -> Self {
        Self::new(
            "connection was destroyed by an earlier fatal error",
            true,
        )
    }
}

impl From<sqlx::Error> for StatementError {
    fn from(err: sqlx::Error) -> Self {
        Self {
            message: err.to_string(),
            fatal: is_fatal(&err),
            source: Some(err),
        }
    }
}

/// Classifies a driver error as connection-level (fatal) or statement-level.
///
/// SQL-level failures (constraint violations, syntax errors, deadlocks) come
/// back as `Error::Database` and leave the session usable; everything that
/// indicates the socket or protocol state is gone forces a destroy.
pub fn is_fatal(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// Unified error surface of the transaction lifecycle manager.
#[derive(Debug, Error)]
pub enum TxnError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    Statement(#[from] StatementError),

    /// The caller referenced a transaction identifier with no live registry
    /// entry: already committed, already rolled back, or never begun.
    #[error("unknown transaction {0}")]
    UnknownTransaction(TxnId),

    #[error(transparent)]
    Format(#[from] FormatError),
}

impl TxnError {
    /// True when the underlying failure indicates the connection had to be
    /// destroyed instead of released.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TxnError::Statement(err) if err.fatal)
    }
}
