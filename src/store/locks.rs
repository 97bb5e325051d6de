//! Table and row lock bookkeeping for the in-memory store
//!
//! This module implements the locking semantics the transfer strategies
//! rely on:
//!
//! - A **table lock** conflicts with everything: the holder is the only
//!   transaction that may touch any balance row.
//! - A **row lock** conflicts with other locks on the same row and with the
//!   table lock, but disjoint rows proceed in parallel.
//!
//! Blocked requests wait on a condvar. Before a request blocks, the manager
//! walks the wait-for graph; if waiting would close a cycle, the requester
//! is aborted with [`LedgerError::LockConflict`] instead. This models a SQL
//! store detecting a deadlock and choosing one participant as the victim.
//!
//! Locks are released only at end of transaction (strict two-phase
//! locking), never early.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard};

use crate::types::{AccountId, LedgerError};

/// Transaction identifier used for lock ownership bookkeeping
pub type TxnId = u64;

/// A lockable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LockTarget {
    /// The entire balance table
    Table,
    /// A single balance row
    Row(AccountId),
}

/// Who holds what, and who is waiting for what
#[derive(Debug, Default)]
struct LockState {
    /// Holder of the table-wide exclusive lock, if any
    table_owner: Option<TxnId>,

    /// Holder of each locked balance row
    row_owners: HashMap<AccountId, TxnId>,

    /// The resource each blocked transaction is currently waiting for
    ///
    /// At most one entry per transaction: a session issues one lock request
    /// at a time. This is the edge set of the wait-for graph.
    waiting_on: HashMap<TxnId, LockTarget>,
}

impl LockState {
    /// Current owner of a target, if any
    fn owner_of(&self, target: LockTarget) -> Option<TxnId> {
        match target {
            LockTarget::Table => self.table_owner,
            LockTarget::Row(account_id) => self.row_owners.get(&account_id).copied(),
        }
    }

    /// Whether `requester` waiting on `blocker` would close a wait cycle
    ///
    /// Follows the chain blocker -> (target it waits on) -> owner -> ...
    /// until the chain ends or reaches the requester.
    fn would_deadlock(&self, requester: TxnId, blocker: TxnId) -> bool {
        let mut current = blocker;
        loop {
            if current == requester {
                return true;
            }
            let Some(&target) = self.waiting_on.get(&current) else {
                return false;
            };
            match self.owner_of(target) {
                Some(owner) if owner != current => current = owner,
                _ => return false,
            }
        }
    }
}

/// Lock manager shared by all transactions of one [`MemoryStore`]
///
/// [`MemoryStore`]: super::MemoryStore
#[derive(Debug, Default)]
pub struct LockManager {
    state: Mutex<LockState>,
    released: Condvar,
}

impl LockManager {
    /// Create a lock manager with nothing held
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, LockState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::store_unavailable("lock manager poisoned"))
    }

    /// Acquire the table-wide exclusive lock for `txn`
    ///
    /// Blocks while any other transaction holds the table lock or any row
    /// lock. Re-entrant for the current holder.
    pub fn lock_table(&self, txn: TxnId) -> Result<(), LedgerError> {
        let mut state = self.lock_state()?;
        loop {
            if state.table_owner == Some(txn) {
                return Ok(());
            }
            let blocker = state
                .table_owner
                .or_else(|| state.row_owners.values().find(|&&owner| owner != txn).copied());
            match blocker {
                None => {
                    state.table_owner = Some(txn);
                    state.waiting_on.remove(&txn);
                    return Ok(());
                }
                Some(blocker) => {
                    if state.would_deadlock(txn, blocker) {
                        state.waiting_on.remove(&txn);
                        return Err(LedgerError::lock_conflict(format!(
                            "transaction {txn} would deadlock waiting for table lock held via transaction {blocker}"
                        )));
                    }
                    state.waiting_on.insert(txn, LockTarget::Table);
                    state = self
                        .released
                        .wait(state)
                        .map_err(|_| LedgerError::store_unavailable("lock manager poisoned"))?;
                }
            }
        }
    }

    /// Acquire an exclusive lock on one balance row for `txn`
    ///
    /// Returns immediately if `txn` already holds the row or the table
    /// lock. Blocks while another transaction holds the row or the table
    /// lock, unless waiting would deadlock, in which case `txn` is aborted
    /// with [`LedgerError::LockConflict`].
    pub fn lock_row(&self, txn: TxnId, account_id: AccountId) -> Result<(), LedgerError> {
        let mut state = self.lock_state()?;
        loop {
            if state.table_owner == Some(txn) {
                return Ok(());
            }
            let blocker = match state.table_owner {
                Some(owner) => Some(owner),
                None => match state.row_owners.get(&account_id) {
                    Some(&owner) if owner != txn => Some(owner),
                    Some(_) => return Ok(()),
                    None => {
                        state.row_owners.insert(account_id, txn);
                        state.waiting_on.remove(&txn);
                        return Ok(());
                    }
                },
            };
            if let Some(blocker) = blocker {
                if state.would_deadlock(txn, blocker) {
                    state.waiting_on.remove(&txn);
                    return Err(LedgerError::lock_conflict(format!(
                        "deadlock detected: transaction {txn} waiting for account {account_id} held by transaction {blocker}"
                    )));
                }
                state.waiting_on.insert(txn, LockTarget::Row(account_id));
                state = self
                    .released
                    .wait(state)
                    .map_err(|_| LedgerError::store_unavailable("lock manager poisoned"))?;
            }
        }
    }

    /// Release everything `txn` holds and wake all waiters
    ///
    /// Called exactly once per transaction, at commit or rollback.
    pub fn release_all(&self, txn: TxnId) {
        // A poisoned manager has no waiters left to wake.
        if let Ok(mut state) = self.state.lock() {
            if state.table_owner == Some(txn) {
                state.table_owner = None;
            }
            state.row_owners.retain(|_, owner| *owner != txn);
            state.waiting_on.remove(&txn);
            self.released.notify_all();
        }
    }

    /// Number of transactions currently blocked on a lock
    #[cfg(test)]
    pub(crate) fn waiting_count(&self) -> usize {
        self.state.lock().map(|state| state.waiting_on.len()).unwrap_or(0)
    }
}
