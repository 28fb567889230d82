//! writegate: an HTTP service that performs multi-statement SQL writes in
//! explicit transactions, one worker per core, each worker owning its own
//! listener handle, connection pool, and transaction registry.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;
pub mod supervisor;
pub mod txn;
pub mod types;
pub mod worker;
pub mod workflows;
