#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use writegate_server::config::Config;
use writegate_server::db::{self, PgTxnPool};
use writegate_server::state::AppState;
use writegate_server::txn::{
    AcquireError, StatementError, StatementOutcome, TxnConnection, TxnManager, TxnPool,
};

/// Scripted statement results plus counters for pool disposals. An empty
/// script answers success, so tests only seed the failures they care about.
#[derive(Default)]
pub struct Script {
    results: Mutex<VecDeque<Result<StatementOutcome, StatementError>>>,
    log: Mutex<Vec<String>>,
    released: AtomicUsize,
    destroyed: AtomicUsize,
}

impl Script {
    pub fn push(&self, result: Result<StatementOutcome, StatementError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

pub struct FakeConn {
    script: Arc<Script>,
}

#[async_trait]
impl TxnConnection for FakeConn {
    async fn raw_query(&mut self, sql: &str) -> Result<StatementOutcome, StatementError> {
        self.script.log.lock().unwrap().push(sql.to_string());
        self.script
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(StatementOutcome { rows_affected: 1 }))
    }
}

pub struct FakePool {
    script: Arc<Script>,
}

#[async_trait]
impl TxnPool for FakePool {
    type Conn = FakeConn;

    async fn acquire(&self) -> Result<FakeConn, AcquireError> {
        Ok(FakeConn {
            script: Arc::clone(&self.script),
        })
    }

    fn release(&self, _conn: FakeConn) {
        self.script.released.fetch_add(1, Ordering::SeqCst);
    }

    async fn destroy(&self, _conn: FakeConn) {
        self.script.destroyed.fetch_add(1, Ordering::SeqCst);
    }

    async fn drain(&self) {}
}

pub fn scripted_manager() -> (TxnManager<FakePool>, Arc<Script>) {
    let script = Arc::new(Script::default());
    let pool = FakePool {
        script: Arc::clone(&script),
    };
    (TxnManager::new(pool), script)
}

/// Config pointing at a port nothing listens on; pool construction stays
/// offline and the first acquire fails fast.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "postgres://localhost:1/writegate_test".to_string(),
        db_max_connections: 1,
        db_acquire_timeout_secs: 1,
        worker_count: 1,
    }
}

/// Worker state over an unreachable lazy pool, for exercising error paths
/// without a database.
pub fn dead_state() -> AppState {
    let config = test_config();
    let pool = db::create_pool(&config).expect("lazy pool construction is offline");
    AppState::new(pool, config, 0)
}

/// Connects to the scratch database named by `TEST_DATABASE_URL`. Only the
/// `#[ignore]`d live tests call this.
pub async fn live_pool() -> PgTxnPool {
    live_pool_of(5).await
}

/// Same scratch database with a caller-chosen connection cap. A cap of one
/// pins every checkout to the same physical connection.
pub async fn live_pool_of(max_connections: u32) -> PgTxnPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a scratch Postgres for live tests");
    let inner = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    PgTxnPool::new(inner)
}
