//! sqlx-backed implementation of the transaction pool and connection seams.
//!
//! Pools are created lazily: construction never touches the network, and the
//! first acquire pays for the actual connect. A worker whose database is down
//! still boots and serves errors instead of failing startup.

use crate::config::Config;
use crate::txn::{AcquireError, StatementError, StatementOutcome, TxnConnection, TxnPool};
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Connection, Executor, Postgres};
use std::time::Duration;
use tracing::debug;

/// One checked-out Postgres connection running raw text statements.
#[derive(Debug)]
pub struct PgTxnConnection {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl TxnConnection for PgTxnConnection {
    async fn raw_query(&mut self, sql: &str) -> Result<StatementOutcome, StatementError> {
        // The simple query protocol: no prepared statements, transaction
        // control statements included.
        let result = self.conn.execute(sqlx::raw_sql(sql)).await?;
        Ok(StatementOutcome {
            rows_affected: result.rows_affected(),
        })
    }
}

#[derive(Clone)]
pub struct PgTxnPool {
    inner: PgPool,
}

impl PgTxnPool {
    pub fn new(inner: PgPool) -> Self {
        Self { inner }
    }

    /// The underlying sqlx pool, for callers that run plain queries outside
    /// any registered transaction (migrations, seeds, health checks).
    pub fn pg(&self) -> &PgPool {
        &self.inner
    }
}

/// Builds the per-worker lazy pool from configuration.
///
/// Lazy still spawns the pool maintenance task, so this must run inside a
/// Tokio runtime context even though no connection is opened yet.
pub fn create_pool(config: &Config) -> Result<PgTxnPool, sqlx::Error> {
    let inner = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect_lazy(&config.database_url)?;
    Ok(PgTxnPool::new(inner))
}

#[async_trait]
impl TxnPool for PgTxnPool {
    type Conn = PgTxnConnection;

    async fn acquire(&self) -> Result<PgTxnConnection, AcquireError> {
        let conn = self.inner.acquire().await?;
        Ok(PgTxnConnection { conn })
    }

    fn release(&self, conn: PgTxnConnection) {
        // Dropping a pool connection hands it back as-is. The pool does not
        // roll raw-SQL transactions back on return, so callers must only
        // release connections whose transaction has ended.
        drop(conn);
    }

    async fn destroy(&self, conn: PgTxnConnection) {
        // Detach first so the pool slot is freed even if the close handshake
        // with the server fails.
        let raw = conn.conn.detach();
        if let Err(err) = raw.close().await {
            debug!(error = %err, "connection close handshake failed");
        }
    }

    async fn drain(&self) {
        self.inner.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_pool() -> PgTxnPool {
        let inner = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy("postgres://localhost:1/writegate_test")
            .expect("lazy pool construction is offline");
        PgTxnPool::new(inner)
    }

    // Pool construction spawns onto the ambient runtime, so even this
    // offline test needs one.
    #[tokio::test]
    async fn lazy_construction_does_not_connect() {
        let pool = lazy_pool();
        assert_eq!(pool.pg().size(), 0);
    }

    #[tokio::test]
    async fn acquire_after_drain_reports_closed_pool() {
        let pool = lazy_pool();
        pool.drain().await;
        let err = pool.acquire().await.expect_err("pool is closed");
        assert!(err.message.contains("closed"), "got: {}", err.message);
    }
}
