//! Per-worker registry of active transactions.
//!
//! Maps a transaction identifier to the connection checked out on its behalf.
//! Each worker owns exactly one registry; entries for different identifiers
//! coexist freely, and an entry exists precisely while a connection is held
//! for that identifier.
//!
//! Because a connection handle is exclusively owned, "get" is expressed as
//! [`TxnRegistry::checkout`] / [`TxnRegistry::restore`]: the caller removes
//! the slot, runs its statement, and puts the slot back. [`TxnRegistry::take`]
//! is the terminal removal used by commit, rollback, and destroy. The mutex
//! guards only map operations and is never held across an await.

use crate::types::TxnId;
use std::collections::HashMap;
use std::sync::Mutex;

/// Holder for one registered transaction.
///
/// `Poisoned` marks a transaction whose connection was destroyed by a fatal
/// statement failure while the transaction was still active. The entry stays
/// visible so the owning caller can resolve it with rollback or destroy; any
/// further statement against it fails without touching the pool.
#[derive(Debug)]
pub enum TxnSlot<C> {
    Live(C),
    Poisoned,
}

impl<C> TxnSlot<C> {
    pub fn is_live(&self) -> bool {
        matches!(self, TxnSlot::Live(_))
    }
}

#[derive(Debug)]
pub struct TxnRegistry<C> {
    entries: Mutex<HashMap<TxnId, TxnSlot<C>>>,
}

impl<C> TxnRegistry<C> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a freshly begun transaction with its live connection.
    pub fn insert(&self, id: TxnId, conn: C) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let replaced = entries.insert(id, TxnSlot::Live(conn));
        debug_assert!(replaced.is_none(), "transaction id collision in registry");
    }

    /// Removes the slot for statement execution; the caller must `restore` it
    /// once the statement completes.
    pub fn checkout(&self, id: TxnId) -> Option<TxnSlot<C>> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
    }

    /// Puts a checked-out slot back under its identifier.
    pub fn restore(&self, id: TxnId, slot: TxnSlot<C>) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, slot);
    }

    /// Terminal removal: commit, rollback, and destroy all end here, exactly
    /// once per identifier.
    pub fn take(&self, id: TxnId) -> Option<TxnSlot<C>> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
    }

    /// Number of currently registered transactions.
    pub fn active_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn contains(&self, id: TxnId) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&id)
    }
}

impl<C> Default for TxnRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_take_removes_the_entry() {
        let registry = TxnRegistry::new();
        let id = TxnId::new();
        registry.insert(id, 7u32);
        assert!(registry.contains(id));
        assert_eq!(registry.active_count(), 1);

        let slot = registry.take(id).expect("entry present");
        assert!(slot.is_live());
        assert!(!registry.contains(id));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn take_on_unknown_id_is_none() {
        let registry: TxnRegistry<u32> = TxnRegistry::new();
        assert!(registry.take(TxnId::new()).is_none());
    }

    #[test]
    fn checkout_and_restore_round_trip() {
        let registry = TxnRegistry::new();
        let id = TxnId::new();
        registry.insert(id, 1u32);

        let slot = registry.checkout(id).expect("entry present");
        assert!(!registry.contains(id));
        registry.restore(id, slot);
        assert!(registry.contains(id));
    }

    #[test]
    fn entries_are_independent_per_identifier() {
        let registry = TxnRegistry::new();
        let first = TxnId::new();
        let second = TxnId::new();
        registry.insert(first, 1u32);
        registry.insert(second, 2u32);
        assert_eq!(registry.active_count(), 2);

        registry.take(first);
        assert!(!registry.contains(first));
        assert!(registry.contains(second));
    }

    #[test]
    fn poisoned_slot_survives_restore() {
        let registry: TxnRegistry<u32> = TxnRegistry::new();
        let id = TxnId::new();
        registry.insert(id, 3);
        registry.checkout(id).expect("entry present");
        registry.restore(id, TxnSlot::Poisoned);

        let slot = registry.take(id).expect("entry present");
        assert!(!slot.is_live());
    }
}
