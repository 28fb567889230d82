use crate::config::Config;
use crate::db::PgTxnPool;
use crate::txn::TxnManager;
use std::sync::Arc;

/// Shared state of one worker's router. Every worker builds its own: pools
/// and transaction registries are never shared across workers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TxnManager<PgTxnPool>>,
    pub config: Config,
    pub worker_index: usize,
}

impl AppState {
    pub fn new(pool: PgTxnPool, config: Config, worker_index: usize) -> Self {
        Self {
            manager: Arc::new(TxnManager::new(pool)),
            config,
            worker_index,
        }
    }
}
