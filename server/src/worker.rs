//! One worker: an OS thread owning a single-threaded runtime, its own lazy
//! connection pool and transaction registry, and an accept handle on the
//! shared listener socket.
//!
//! A worker survives request-level failures through the error layer; a panic
//! in the serve loop is caught so the pool can still be drained, and the
//! spawn wrapper converts any unwind, setup included, into an exit report so
//! the supervisor always hears about the death and decides whether to
//! respawn. Abandoned in-flight transactions are left to the database
//! server's own reclamation.

use crate::config::Config;
use crate::db::{self, PgTxnPool};
use crate::handlers;
use crate::state::AppState;
use crate::txn::TxnPool;
use std::any::Any;
use std::net::TcpListener as StdTcpListener;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tokio::runtime;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// Terminal report a worker sends the supervisor. Sent on every exit path,
/// panics included; the supervisor blocks on these to drive respawns.
#[derive(Debug)]
pub struct WorkerExit {
    pub index: usize,
    pub outcome: WorkerOutcome,
}

#[derive(Debug)]
pub enum WorkerOutcome {
    /// Graceful stop after a shutdown signal.
    Finished,
    /// The serve loop or worker setup failed with an error.
    Failed(String),
    /// Something unwound past the serve loop.
    Panicked(String),
}

pub struct WorkerHandle {
    pub index: usize,
    thread: thread::JoinHandle<()>,
}

impl WorkerHandle {
    pub fn join(self) {
        if self.thread.join().is_err() {
            // The worker reports panics itself; the join result only tells us
            // the thread is gone.
            warn!(worker = self.index, "worker thread join reported a panic");
        }
    }
}

/// Spawns one worker thread accepting on its own clone of the listener.
pub fn spawn(
    index: usize,
    listener: StdTcpListener,
    config: Config,
    shutdown: watch::Receiver<bool>,
    exits: mpsc::UnboundedSender<WorkerExit>,
) -> std::io::Result<WorkerHandle> {
    let thread = thread::Builder::new()
        .name(format!("writegate-worker-{index}"))
        .spawn(move || {
            // A panic anywhere in the worker, setup included, must still
            // produce an exit report or the supervisor waits forever.
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| run(index, listener, config, shutdown)))
                    .unwrap_or_else(|payload| {
                        let message = panic_message(payload);
                        error!(worker = index, message = %message, "worker died before cleanup");
                        WorkerOutcome::Panicked(message)
                    });
            let _ = exits.send(WorkerExit { index, outcome });
        })?;
    Ok(WorkerHandle { index, thread })
}

fn run(
    index: usize,
    listener: StdTcpListener,
    config: Config,
    shutdown: watch::Receiver<bool>,
) -> WorkerOutcome {
    let runtime = match runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(worker = index, error = %err, "failed to build worker runtime");
            return WorkerOutcome::Failed(err.to_string());
        }
    };

    // Pool construction spawns its maintenance task, so it needs the runtime
    // context even though connecting is deferred.
    let pool = {
        let _guard = runtime.enter();
        match db::create_pool(&config) {
            Ok(pool) => pool,
            Err(err) => {
                error!(worker = index, error = %err, "failed to build worker pool");
                return WorkerOutcome::Failed(err.to_string());
            }
        }
    };

    let state = AppState::new(pool.clone(), config, index);
    let router = handlers::app_router(state);

    let serve_result = panic::catch_unwind(AssertUnwindSafe(|| {
        runtime.block_on(async move {
            listener.set_nonblocking(true)?;
            let local_addr = listener.local_addr()?;
            let listener = tokio::net::TcpListener::from_std(listener)?;
            info!(worker = index, addr = %local_addr, "worker accepting connections");
            axum::serve(listener, router)
                .with_graceful_shutdown(wait_for_stop(shutdown))
                .await
        })
    }));

    // Tear the serve tasks down before draining, so connections they still
    // held are returned and the drain cannot wait on them.
    drop(runtime);

    let outcome = match serve_result {
        Ok(Ok(())) => {
            info!(worker = index, "worker stopped");
            WorkerOutcome::Finished
        }
        Ok(Err(err)) => {
            error!(worker = index, error = %err, "worker serve loop failed");
            WorkerOutcome::Failed(err.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload);
            error!(worker = index, message = %message, "worker panicked");
            WorkerOutcome::Panicked(message)
        }
    };

    drain_pool(index, &pool);
    outcome
}

async fn wait_for_stop(mut shutdown: watch::Receiver<bool>) {
    // A closed channel counts as a stop signal.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

fn drain_pool(index: usize, pool: &PgTxnPool) {
    match runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => {
            runtime.block_on(pool.drain());
            info!(worker = index, "worker pool drained");
        }
        Err(err) => {
            warn!(worker = index, error = %err, "could not drain worker pool");
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "postgres://localhost:1/writegate_test".to_string(),
            db_max_connections: 1,
            db_acquire_timeout_secs: 1,
            worker_count: 1,
        }
    }

    #[test]
    fn worker_stops_on_shutdown_signal() {
        let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind");
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (exit_tx, mut exit_rx) = mpsc::unbounded_channel();

        let handle =
            spawn(0, listener, test_config(), shutdown_rx, exit_tx).expect("spawn worker");
        shutdown_tx.send(true).expect("send shutdown");

        let exit = exit_rx.blocking_recv().expect("worker exit report");
        assert_eq!(exit.index, 0);
        assert!(matches!(exit.outcome, WorkerOutcome::Finished));
        handle.join();
    }

    #[test]
    fn dropping_the_shutdown_sender_stops_the_worker() {
        let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind");
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (exit_tx, mut exit_rx) = mpsc::unbounded_channel();

        let handle =
            spawn(3, listener, test_config(), shutdown_rx, exit_tx).expect("spawn worker");
        drop(shutdown_tx);

        let exit = exit_rx.blocking_recv().expect("worker exit report");
        assert_eq!(exit.index, 3);
        assert!(matches!(exit.outcome, WorkerOutcome::Finished));
        handle.join();
    }

    #[test]
    fn setup_failure_still_reports_an_exit() {
        let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind");
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (exit_tx, mut exit_rx) = mpsc::unbounded_channel();

        let config = Config {
            database_url: "not a database url".to_string(),
            ..test_config()
        };
        let handle = spawn(1, listener, config, shutdown_rx, exit_tx).expect("spawn worker");

        // The worker never reaches the serve loop; the supervisor must still
        // hear about it.
        let exit = exit_rx.blocking_recv().expect("worker exit report");
        assert_eq!(exit.index, 1);
        assert!(matches!(exit.outcome, WorkerOutcome::Failed(_)));
        handle.join();
    }

    #[test]
    fn panic_message_extracts_str_and_string() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("boom".to_string())), "boom");
        assert_eq!(panic_message(Box::new(7u8)), "unknown panic payload");
    }
}
