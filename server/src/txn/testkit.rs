//! Scripted pool and connection fakes shared by the unit tests.
//!
//! `Script` seeds per-statement results and records every SQL text plus each
//! release/destroy the pool performs, so tests can assert on the exact
//! statement sequence and disposal counts. An empty script answers success.

use crate::txn::error::{AcquireError, StatementError};
use crate::txn::manager::{StatementOutcome, TxnConnection, TxnManager, TxnPool};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

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

    /// Seeds failures for the next statements by position: `at` counts the
    /// statements still to come, zero-based.
    pub fn fail_nth(&self, at: usize, error: StatementError) {
        let mut results = self.results.lock().unwrap();
        while results.len() < at {
            results.push_back(Ok(StatementOutcome { rows_affected: 1 }));
        }
        results.push_back(Err(error));
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
