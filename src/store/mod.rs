//! Ledger store module
//!
//! The transfer strategies never touch tables directly; they speak to a
//! [`LedgerStore`] collaborator through the traits defined here. This keeps
//! the concurrency-control logic independent of where the ledger actually
//! lives and lets tests substitute fault-injecting stores.
//!
//! # Components
//!
//! - `LedgerStore` / `StoreTransaction` - the storage contract
//! - `locks` - table and row lock bookkeeping with deadlock detection
//! - `memory` - in-memory reference implementation of the contract
//!
//! # Isolation
//!
//! The contract assumes read-committed semantics: plain reads observe only
//! committed state, and a commit applies all of a transaction's writes
//! atomically, so no reader ever sees a transfer's debit without its
//! matching credit. `for_update` reads take row locks that are held until
//! commit or rollback (strict two-phase locking), which makes the transfer
//! strategies' access pattern serializable.

pub mod locks;
pub mod memory;

pub use memory::MemoryStore;

use crate::types::{AccountBalance, AccountId, LedgerError, TransactionRecord};
use rust_decimal::Decimal;

/// The storage collaborator the transfer engine runs against
///
/// One logical caller per transaction: a [`StoreTransaction`] is a
/// single-owner session and must not be shared between threads. The store
/// itself is shared freely.
pub trait LedgerStore: Send + Sync {
    /// Create an account together with its zero-balance row
    ///
    /// The two inserts are atomic: an account exists iff its balance row
    /// does. The identifier is assigned by the store.
    ///
    /// # Returns
    ///
    /// The identifier of the newly created account
    fn create_account(&self, name: &str) -> Result<AccountId, LedgerError>;

    /// List all account identifiers, in ascending order
    fn list_account_ids(&self) -> Result<Vec<AccountId>, LedgerError>;

    /// Read all committed balances, joined with account names, for reporting
    fn account_balances(&self) -> Result<Vec<AccountBalance>, LedgerError>;

    /// Read the committed transaction log, in append order
    fn transaction_log(&self) -> Result<Vec<TransactionRecord>, LedgerError>;

    /// Begin a new transaction
    ///
    /// Writes performed through the returned handle are invisible to other
    /// sessions until `commit`; dropping the handle without committing
    /// rolls back.
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, LedgerError>;
}

/// A single in-flight transaction against a [`LedgerStore`]
///
/// All balance mutation happens through this handle. Locks acquired by any
/// operation are held until `commit` or `rollback`.
pub trait StoreTransaction {
    /// Take an exclusive lock on the entire balance table
    ///
    /// Blocks until no other transaction holds the table lock or any row
    /// lock. Used by the exclusive-lock strategy only; once held, no
    /// concurrent transfer can observe or mutate any balance.
    fn lock_table_exclusive(&mut self) -> Result<(), LedgerError>;

    /// Read an account's balance
    ///
    /// With `for_update` set, acquires an exclusive lock on the balance row
    /// first, blocking while another transaction holds it. The store may
    /// abort this transaction with [`LedgerError::LockConflict`] if waiting
    /// would deadlock.
    ///
    /// # Errors
    ///
    /// - `ConstraintViolation` if the account does not exist
    /// - `LockConflict` if this transaction was chosen as a deadlock victim
    fn read_balance(&mut self, account_id: AccountId, for_update: bool)
        -> Result<Decimal, LedgerError>;

    /// Stage a new balance for an account
    ///
    /// Implicitly locks the row unless this transaction already holds the
    /// table lock. The write becomes visible only at commit.
    fn write_balance(&mut self, account_id: AccountId, new_balance: Decimal)
        -> Result<(), LedgerError>;

    /// Stage an append to the transaction log
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` if either account does not exist
    fn append_transaction(
        &mut self,
        debit_account_id: AccountId,
        credit_account_id: AccountId,
        amount: Decimal,
    ) -> Result<(), LedgerError>;

    /// Commit all staged writes atomically and release every held lock
    fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    /// Discard all staged writes and release every held lock
    fn rollback(self: Box<Self>);
}
