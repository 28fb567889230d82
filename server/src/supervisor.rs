//! Worker supervision: binds the shared listener, runs one-time primary
//! initialization, spawns one worker per configured core, and respawns any
//! worker that exits before shutdown is requested.

use crate::config::Config;
use crate::db;
use crate::txn::{TxnManager, TxnPool};
use crate::worker::{self, WorkerExit, WorkerHandle};
use crate::workflows::demo::run_demo_write;
use std::collections::HashMap;
use std::net::TcpListener as StdTcpListener;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

pub async fn run(config: Config) -> anyhow::Result<()> {
    let listener = StdTcpListener::bind(config.listen_addr())?;
    info!(
        addr = %listener.local_addr()?,
        workers = config.worker_count,
        "supervisor listening"
    );

    primary_init(&config).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (exit_tx, mut exit_rx) = mpsc::unbounded_channel::<WorkerExit>();

    let mut workers: HashMap<usize, WorkerHandle> = HashMap::new();
    for index in 0..config.worker_count {
        let handle = worker::spawn(
            index,
            listener.try_clone()?,
            config.clone(),
            shutdown_rx.clone(),
            exit_tx.clone(),
        )?;
        workers.insert(index, handle);
    }

    let mut shutting_down = false;
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c, if !shutting_down => {
                if let Err(err) = result {
                    warn!(error = %err, "shutdown signal listener failed; stopping anyway");
                }
                info!("shutdown requested, stopping workers");
                shutting_down = true;
                let _ = shutdown_tx.send(true);
            }
            exit = exit_rx.recv() => {
                // The supervisor keeps a sender, so the channel cannot close
                // while this loop runs.
                let Some(exit) = exit else { break };
                if let Some(handle) = workers.remove(&exit.index) {
                    // The exit report is sent after worker cleanup, so the
                    // thread is already returning.
                    handle.join();
                }
                if shutting_down {
                    info!(worker = exit.index, "worker stopped");
                    if workers.is_empty() {
                        break;
                    }
                } else {
                    warn!(
                        worker = exit.index,
                        outcome = ?exit.outcome,
                        "worker exited, respawning"
                    );
                    let handle = worker::spawn(
                        exit.index,
                        listener.try_clone()?,
                        config.clone(),
                        shutdown_rx.clone(),
                        exit_tx.clone(),
                    )?;
                    workers.insert(exit.index, handle);
                }
            }
        }
    }

    info!("all workers stopped");
    Ok(())
}

/// One-time initialization: migrations plus one seeded demo write. Failure is
/// reported but does not block worker startup; a worker with a reachable
/// database serves while an unreachable one answers with errors.
async fn primary_init(config: &Config) {
    info!("running primary initialization");
    if let Err(err) = try_primary_init(config).await {
        warn!(error = %err, "primary initialization failed, starting workers anyway");
    }
}

async fn try_primary_init(config: &Config) -> anyhow::Result<()> {
    let pool = db::create_pool(config)?;
    sqlx::migrate!("./migrations").run(pool.pg()).await?;

    let manager = TxnManager::new(pool.clone());
    let outcome = run_demo_write(&manager).await?;
    info!(
        country_id = %outcome.country_id,
        state_id = %outcome.state_id,
        "seeded demo rows"
    );

    pool.drain().await;
    Ok(())
}
