//! Explicit multi-statement transactions over pooled connections.
//!
//! The registry tracks which connection belongs to which transaction, the
//! formatter renders `:name` templates into literal SQL, and the manager ties
//! both to a pool behind the [`TxnPool`] / [`TxnConnection`] seams.

pub mod error;
pub mod format;
pub mod manager;
pub mod registry;
#[cfg(test)]
pub mod testkit;

pub use error::{AcquireError, StatementError, TxnError};
pub use format::{format_query, FormatError, Params, ScalarValue};
pub use manager::{StatementOutcome, TxnConnection, TxnManager, TxnPool};
pub use registry::{TxnRegistry, TxnSlot};
