//! Transaction lifecycle manager.
//!
//! Owns the begin / execute / commit / rollback / destroy operations over a
//! pool of raw connections. A transaction pins one connection from `begin`
//! until a terminal operation; in between, every statement for that
//! transaction runs on the pinned connection, found through the registry.
//!
//! Disposal discipline: a connection that failed fatally is destroyed and its
//! registry slot poisoned, a connection whose statement failed recoverably
//! stays pinned so the caller can roll the transaction back, and a healthy
//! connection is released to the pool only by commit or rollback.

use crate::txn::error::{AcquireError, StatementError, TxnError};
use crate::txn::format::{format_query, Params};
use crate::txn::registry::{TxnRegistry, TxnSlot};
use crate::types::TxnId;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Result of a single write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementOutcome {
    pub rows_affected: u64,
}

/// One raw connection capable of running a text statement.
///
/// Use `MockTxnConnection` in tests to mock the behavior.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TxnConnection: Send {
    async fn raw_query(&mut self, sql: &str) -> Result<StatementOutcome, StatementError>;
}

/// The pool the manager borrows connections from.
///
/// `release` returns a healthy connection for reuse; `destroy` closes a
/// connection whose session state can no longer be trusted; `drain` closes
/// the pool and every idle connection in it.
#[cfg_attr(test, mockall::automock(type Conn = MockTxnConnection;))]
#[async_trait]
pub trait TxnPool: Send + Sync {
    type Conn: TxnConnection + Send;

    async fn acquire(&self) -> Result<Self::Conn, AcquireError>;
    fn release(&self, conn: Self::Conn);
    async fn destroy(&self, conn: Self::Conn);
    async fn drain(&self);
}

pub struct TxnManager<P: TxnPool> {
    pool: P,
    registry: TxnRegistry<P::Conn>,
}

impl<P: TxnPool> TxnManager<P> {
    pub fn new(pool: P) -> Self {
        Self {
            pool,
            registry: TxnRegistry::new(),
        }
    }

    /// Starts a transaction: acquires a connection, opens an explicit
    /// transaction on it, and registers the pair under a fresh identifier.
    pub async fn begin(&self) -> Result<TxnId, TxnError> {
        let mut conn = self.pool.acquire().await?;
        let id = TxnId::new();
        match conn.raw_query("START TRANSACTION").await {
            Ok(_) => {
                self.registry.insert(id, conn);
                debug!(txn_id = %id, "transaction started");
                Ok(id)
            }
            Err(err) => {
                // Nothing was registered, so the connection can go straight
                // back to the pool when it is still usable.
                warn!(error = %err, "failed to open transaction");
                self.dispose(conn, err.fatal).await;
                Err(err.into())
            }
        }
    }

    /// Renders `template` with `params` and runs it inside the transaction.
    ///
    /// The statement text is fully rendered before the registry is touched,
    /// so a bad template never costs a checkout. On a recoverable failure the
    /// transaction stays open and pinned; the caller decides whether to roll
    /// back. On a fatal failure the connection is destroyed immediately and
    /// the entry poisoned until the caller resolves it.
    pub async fn execute(
        &self,
        id: TxnId,
        template: &str,
        params: &Params,
    ) -> Result<StatementOutcome, TxnError> {
        let sql = format_query(template, params)?;
        let mut conn = match self
            .registry
            .checkout(id)
            .ok_or(TxnError::UnknownTransaction(id))?
        {
            TxnSlot::Live(conn) => conn,
            TxnSlot::Poisoned => {
                self.registry.restore(id, TxnSlot::Poisoned);
                return Err(StatementError::connection_lost().into());
            }
        };

        match conn.raw_query(&sql).await {
            Ok(outcome) => {
                self.registry.restore(id, TxnSlot::Live(conn));
                debug!(txn_id = %id, rows = outcome.rows_affected, "statement applied");
                Ok(outcome)
            }
            Err(err) if err.fatal => {
                warn!(txn_id = %id, error = %err, "fatal statement failure, destroying connection");
                self.pool.destroy(conn).await;
                self.registry.restore(id, TxnSlot::Poisoned);
                Err(err.into())
            }
            Err(err) => {
                // Transaction is still open on this connection; keep it
                // pinned so the caller's rollback lands on the same session.
                self.registry.restore(id, TxnSlot::Live(conn));
                Err(err.into())
            }
        }
    }

    /// Commits and releases the connection. If COMMIT itself fails on a
    /// usable connection the transaction is rolled back before the error is
    /// reported, so no half-applied work can leak into a later reuse of the
    /// connection.
    pub async fn commit(&self, id: TxnId) -> Result<(), TxnError> {
        let mut conn = match self
            .registry
            .take(id)
            .ok_or(TxnError::UnknownTransaction(id))?
        {
            TxnSlot::Live(conn) => conn,
            TxnSlot::Poisoned => return Err(StatementError::connection_lost().into()),
        };

        match conn.raw_query("COMMIT").await {
            Ok(_) => {
                self.pool.release(conn);
                debug!(txn_id = %id, "transaction committed");
                Ok(())
            }
            Err(commit_err) => {
                warn!(txn_id = %id, error = %commit_err, "commit failed, rolling back");
                if commit_err.fatal {
                    self.pool.destroy(conn).await;
                    return Err(commit_err.into());
                }
                match self.rollback_conn(conn).await {
                    Ok(()) => Err(commit_err.into()),
                    Err(rollback_err) => Err(rollback_err.into()),
                }
            }
        }
    }

    /// Rolls the transaction back and removes it from the registry. Rolling
    /// back a poisoned entry succeeds: the connection is already gone and the
    /// server discarded the transaction with it, so only cleanup remains.
    pub async fn rollback(&self, id: TxnId) -> Result<(), TxnError> {
        match self
            .registry
            .take(id)
            .ok_or(TxnError::UnknownTransaction(id))?
        {
            TxnSlot::Live(conn) => {
                self.rollback_conn(conn).await?;
                debug!(txn_id = %id, "transaction rolled back");
                Ok(())
            }
            TxnSlot::Poisoned => {
                debug!(txn_id = %id, "cleared poisoned transaction");
                Ok(())
            }
        }
    }

    /// Terminal escape hatch: removes the entry without running any of the
    /// caller's statements. A fatal error destroys the connection outright;
    /// otherwise the transaction still open on it is rolled back before the
    /// release, because the pool hands connections back as-is and an open
    /// transaction would resurface at the next checkout.
    pub async fn destroy(&self, id: TxnId, fatal: bool) -> Result<(), TxnError> {
        let slot = self
            .registry
            .take(id)
            .ok_or(TxnError::UnknownTransaction(id))?;
        warn!(txn_id = %id, fatal, "transaction destroyed");
        match slot {
            TxnSlot::Live(conn) if fatal => self.pool.destroy(conn).await,
            TxnSlot::Live(conn) => self.rollback_conn(conn).await?,
            TxnSlot::Poisoned => {}
        }
        Ok(())
    }

    /// Number of transactions currently pinning a registry entry.
    pub fn active_transactions(&self) -> usize {
        self.registry.active_count()
    }

    async fn rollback_conn(&self, mut conn: P::Conn) -> Result<(), StatementError> {
        match conn.raw_query("ROLLBACK").await {
            Ok(_) => {
                self.pool.release(conn);
                Ok(())
            }
            Err(err) => {
                // A connection whose ROLLBACK failed has unknown transaction
                // state and is never given back for reuse.
                warn!(error = %err, "rollback failed, destroying connection");
                self.pool.destroy(conn).await;
                Err(err)
            }
        }
    }

    /// Disposal for a connection with no transaction open on it. Only begin
    /// ends up here: a failed `START TRANSACTION` leaves the session outside
    /// any transaction, so a recoverable failure can release the connection
    /// as-is.
    async fn dispose(&self, conn: P::Conn, fatal: bool) {
        if fatal {
            self.pool.destroy(conn).await;
        } else {
            self.pool.release(conn);
        }
    }
}
