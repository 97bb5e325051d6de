//! In-memory ledger store
//!
//! Reference implementation of the [`LedgerStore`] contract, used by the
//! CLI simulation, the tests, and the benches. It keeps three tables:
//!
//! - an account registry (`DashMap`, concurrent creation and listing)
//! - one balance row per account
//! - the append-only transaction log
//!
//! Balances and the log live behind a single `RwLock` so that a commit
//! applies every staged write in one step: a concurrent reader either sees
//! all of a transfer or none of it. Writes are staged per transaction and
//! row/table locks come from the [`LockManager`]; locks are held until the
//! transaction finishes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::store::locks::{LockManager, TxnId};
use crate::store::{LedgerStore, StoreTransaction};
use crate::types::{Account, AccountBalance, AccountId, LedgerError, TransactionRecord};

/// Committed table state: balances and the transaction log
#[derive(Debug, Default)]
struct CommittedTables {
    /// One signed balance per account
    balances: HashMap<AccountId, Decimal>,

    /// Append-only transfer log; a record's index is its implicit timestamp
    transactions: Vec<TransactionRecord>,
}

/// In-memory implementation of the ledger store contract
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Account registry, keyed by store-assigned identifier
    accounts: DashMap<AccountId, Account>,

    /// Committed balances and transaction log
    ///
    /// The write lock is held only for the duration of a commit or an
    /// account creation, never while a transaction is in flight.
    tables: RwLock<CommittedTables>,

    /// Table and row lock bookkeeping shared by all transactions
    locks: LockManager,

    next_account_id: AtomicU64,
    next_txn_id: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read_tables(&self) -> Result<RwLockReadGuard<'_, CommittedTables>, LedgerError> {
        self.tables
            .read()
            .map_err(|_| LedgerError::store_unavailable("store tables poisoned"))
    }

    fn write_tables(&self) -> Result<RwLockWriteGuard<'_, CommittedTables>, LedgerError> {
        self.tables
            .write()
            .map_err(|_| LedgerError::store_unavailable("store tables poisoned"))
    }
}

impl LedgerStore for MemoryStore {
    fn create_account(&self, name: &str) -> Result<AccountId, LedgerError> {
        let account_id = self.next_account_id.fetch_add(1, Ordering::Relaxed) + 1;

        // Insert the account and its zero-balance row under the table write
        // lock so the 1:1 account/balance invariant is never observable as
        // broken.
        let mut tables = self.write_tables()?;
        self.accounts.insert(account_id, Account::new(account_id, name));
        tables.balances.insert(account_id, Decimal::ZERO);

        tracing::debug!(account_id, name, "created account with zero balance");
        Ok(account_id)
    }

    fn list_account_ids(&self) -> Result<Vec<AccountId>, LedgerError> {
        let mut ids: Vec<AccountId> = self.accounts.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn account_balances(&self) -> Result<Vec<AccountBalance>, LedgerError> {
        let tables = self.read_tables()?;
        let mut balances: Vec<AccountBalance> = tables
            .balances
            .iter()
            .map(|(&account_id, &balance)| {
                let name = self
                    .accounts
                    .get(&account_id)
                    .map(|account| account.name.clone())
                    .unwrap_or_default();
                AccountBalance {
                    account_id,
                    name,
                    balance,
                }
            })
            .collect();
        balances.sort_by_key(|row| row.account_id);
        Ok(balances)
    }

    fn transaction_log(&self) -> Result<Vec<TransactionRecord>, LedgerError> {
        Ok(self.read_tables()?.transactions.clone())
    }

    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, LedgerError> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(txn_id, "BEGIN");
        Ok(Box::new(MemoryTransaction {
            store: self,
            txn_id,
            staged_balances: HashMap::new(),
            staged_log: Vec::new(),
            finished: false,
        }))
    }
}

/// One in-flight transaction against a [`MemoryStore`]
///
/// Writes are staged locally and applied to the committed tables in one
/// step at commit. Dropping the transaction without committing rolls back.
pub struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    txn_id: TxnId,
    staged_balances: HashMap<AccountId, Decimal>,
    staged_log: Vec<TransactionRecord>,
    finished: bool,
}

impl MemoryTransaction<'_> {
    fn committed_balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        self.store
            .read_tables()?
            .balances
            .get(&account_id)
            .copied()
            .ok_or_else(|| {
                LedgerError::constraint_violation(format!("no balance row for account {account_id}"))
            })
    }

    fn require_account(&self, account_id: AccountId) -> Result<(), LedgerError> {
        if self.store.accounts.contains_key(&account_id) {
            Ok(())
        } else {
            Err(LedgerError::constraint_violation(format!(
                "account {account_id} does not exist"
            )))
        }
    }

    fn finish(&mut self) {
        self.store.locks.release_all(self.txn_id);
        self.finished = true;
    }
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn lock_table_exclusive(&mut self) -> Result<(), LedgerError> {
        tracing::debug!(txn_id = self.txn_id, "LOCK TABLE balances EXCLUSIVE");
        self.store.locks.lock_table(self.txn_id)
    }

    fn read_balance(
        &mut self,
        account_id: AccountId,
        for_update: bool,
    ) -> Result<Decimal, LedgerError> {
        tracing::debug!(txn_id = self.txn_id, account_id, for_update, "SELECT balance");
        if for_update {
            self.store.locks.lock_row(self.txn_id, account_id)?;
        }
        if let Some(&staged) = self.staged_balances.get(&account_id) {
            return Ok(staged);
        }
        self.committed_balance(account_id)
    }

    fn write_balance(
        &mut self,
        account_id: AccountId,
        new_balance: Decimal,
    ) -> Result<(), LedgerError> {
        tracing::debug!(
            txn_id = self.txn_id,
            account_id,
            %new_balance,
            "UPDATE balance"
        );
        // An UPDATE locks its row even when the caller skipped the locking
        // read; a held table lock already covers it.
        self.store.locks.lock_row(self.txn_id, account_id)?;
        self.require_account(account_id)?;
        self.staged_balances.insert(account_id, new_balance);
        Ok(())
    }

    fn append_transaction(
        &mut self,
        debit_account_id: AccountId,
        credit_account_id: AccountId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        tracing::debug!(
            txn_id = self.txn_id,
            debit_account_id,
            credit_account_id,
            %amount,
            "INSERT transaction"
        );
        self.require_account(debit_account_id)?;
        self.require_account(credit_account_id)?;
        self.staged_log.push(TransactionRecord {
            debit_account_id,
            credit_account_id,
            amount,
        });
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), LedgerError> {
        {
            let mut tables = match self.store.write_tables() {
                Ok(tables) => tables,
                Err(err) => {
                    self.finish();
                    return Err(err);
                }
            };
            for (account_id, balance) in self.staged_balances.drain() {
                tables.balances.insert(account_id, balance);
            }
            tables.transactions.append(&mut self.staged_log);
        }
        tracing::debug!(txn_id = self.txn_id, "COMMIT");
        self.finish();
        Ok(())
    }

    fn rollback(mut self: Box<Self>) {
        tracing::debug!(txn_id = self.txn_id, "ROLLBACK");
        self.staged_balances.clear();
        self.staged_log.clear();
        self.finish();
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(txn_id = self.txn_id, "ROLLBACK (dropped)");
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    #[test]
    fn test_create_account_assigns_unique_ids_and_zero_balance() {
        let store = MemoryStore::new();
        let alice = store.create_account("alice").unwrap();
        let bob = store.create_account("bob").unwrap();

        assert_ne!(alice, bob);
        assert_eq!(store.list_account_ids().unwrap(), vec![alice, bob]);

        let balances = store.account_balances().unwrap();
        assert_eq!(balances.len(), 2);
        assert!(balances.iter().all(|row| row.balance == Decimal::ZERO));
        assert_eq!(balances[0].name, "alice");
    }

    #[test]
    fn test_committed_writes_are_visible_and_staged_writes_are_not() {
        let store = MemoryStore::new();
        let alice = store.create_account("alice").unwrap();

        let mut txn = store.begin().unwrap();
        txn.write_balance(alice, dec(42)).unwrap();

        // Staged write is invisible to other readers until commit.
        assert_eq!(store.account_balances().unwrap()[0].balance, Decimal::ZERO);
        // ...but the writer reads its own staged value.
        assert_eq!(txn.read_balance(alice, false).unwrap(), dec(42));

        txn.commit().unwrap();
        assert_eq!(store.account_balances().unwrap()[0].balance, dec(42));
    }

    #[test]
    fn test_rollback_discards_staged_writes_and_releases_locks() {
        let store = MemoryStore::new();
        let alice = store.create_account("alice").unwrap();

        let mut txn = store.begin().unwrap();
        txn.read_balance(alice, true).unwrap();
        txn.write_balance(alice, dec(99)).unwrap();
        txn.append_transaction(alice, alice, dec(99)).unwrap();
        txn.rollback();

        assert_eq!(store.account_balances().unwrap()[0].balance, Decimal::ZERO);
        assert!(store.transaction_log().unwrap().is_empty());

        // The row lock was released: a fresh transaction can take it.
        let mut txn = store.begin().unwrap();
        txn.read_balance(alice, true).unwrap();
        txn.rollback();
    }

    #[test]
    fn test_drop_without_commit_rolls_back() {
        let store = MemoryStore::new();
        let alice = store.create_account("alice").unwrap();

        {
            let mut txn = store.begin().unwrap();
            txn.write_balance(alice, dec(7)).unwrap();
        }

        assert_eq!(store.account_balances().unwrap()[0].balance, Decimal::ZERO);
        let mut txn = store.begin().unwrap();
        txn.read_balance(alice, true).unwrap();
        txn.rollback();
    }

    #[test]
    fn test_unknown_account_is_a_constraint_violation() {
        let store = MemoryStore::new();
        let alice = store.create_account("alice").unwrap();

        let mut txn = store.begin().unwrap();
        assert!(matches!(
            txn.read_balance(999, false),
            Err(LedgerError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            txn.write_balance(999, dec(1)),
            Err(LedgerError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            txn.append_transaction(alice, 999, dec(1)),
            Err(LedgerError::ConstraintViolation { .. })
        ));
        txn.rollback();
    }

    #[test]
    fn test_transaction_log_preserves_append_order() {
        let store = MemoryStore::new();
        let alice = store.create_account("alice").unwrap();
        let bob = store.create_account("bob").unwrap();

        for amount in 1..=3 {
            let mut txn = store.begin().unwrap();
            txn.append_transaction(alice, bob, dec(amount)).unwrap();
            txn.commit().unwrap();
        }

        let log = store.transaction_log().unwrap();
        let amounts: Vec<Decimal> = log.iter().map(|record| record.amount).collect();
        assert_eq!(amounts, vec![dec(1), dec(2), dec(3)]);
    }

    #[test]
    fn test_for_update_read_blocks_second_transaction_until_commit() {
        let store = Arc::new(MemoryStore::new());
        let alice = store.create_account("alice").unwrap();

        let mut first = store.begin().unwrap();
        first.read_balance(alice, true).unwrap();
        first.write_balance(alice, dec(10)).unwrap();

        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut txn = store.begin().unwrap();
                let balance = txn.read_balance(alice, true).unwrap();
                txn.rollback();
                balance
            })
        };

        // Give the reader time to block on the row lock, then commit.
        thread::sleep(Duration::from_millis(20));
        first.commit().unwrap();

        // The blocked reader must observe the committed value, never the
        // staged one.
        assert_eq!(reader.join().unwrap(), dec(10));
    }
}
