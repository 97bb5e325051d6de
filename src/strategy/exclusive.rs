//! Exclusive-lock transfer strategy
//!
//! The simplest correct protocol: take an exclusive lock on the entire
//! balance table before touching any row, so no concurrent transfer can
//! observe or mutate balances mid-operation. Every transfer anywhere in the
//! system queues behind the lock holder - total ordering at the cost of
//! zero parallelism.
//!
//! # Protocol
//!
//! ```text
//! Idle -> LockAcquired -> RecordInserted -> DebitUpdated -> CreditUpdated -> Committed
//! ```
//!
//! with a rollback reachable from any non-committed state on error.
//!
//! # Failure handling
//!
//! Any error rolls back the whole transaction and propagates to the caller.
//! No retry is attempted: a held table lock admits no contention, so a
//! failure here is never transient.

use crate::core::TransferPolicy;
use crate::store::{LedgerStore, StoreTransaction};
use crate::strategy::TransferStrategy;
use crate::types::{LedgerError, TransferRequest};

/// Transfer strategy that serializes all transfers behind a table lock
#[derive(Debug, Clone, Copy, Default)]
pub struct ExclusiveLockStrategy;

impl ExclusiveLockStrategy {
    /// The transfer protocol body, run between begin and commit/rollback
    fn apply(
        txn: &mut dyn StoreTransaction,
        request: &TransferRequest,
        policy: &TransferPolicy,
    ) -> Result<(), LedgerError> {
        txn.lock_table_exclusive()?;

        txn.append_transaction(
            request.debit_account_id,
            request.credit_account_id,
            request.amount,
        )?;

        let debit_balance = txn.read_balance(request.debit_account_id, false)?;
        policy.check_debit(request, debit_balance)?;
        let new_debit = debit_balance
            .checked_sub(request.amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("debit", request.debit_account_id))?;
        txn.write_balance(request.debit_account_id, new_debit)?;

        // Reads its own staged debit when the two accounts coincide, so a
        // self-transfer nets to zero.
        let credit_balance = txn.read_balance(request.credit_account_id, false)?;
        let new_credit = credit_balance
            .checked_add(request.amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("credit", request.credit_account_id))?;
        txn.write_balance(request.credit_account_id, new_credit)?;

        Ok(())
    }
}

impl TransferStrategy for ExclusiveLockStrategy {
    fn transfer(
        &self,
        store: &dyn LedgerStore,
        request: &TransferRequest,
        policy: &TransferPolicy,
    ) -> Result<(), LedgerError> {
        let mut txn = store.begin()?;
        match Self::apply(txn.as_mut(), request, policy) {
            Ok(()) => txn.commit(),
            Err(err) => {
                txn.rollback();
                Err(err)
            }
        }
    }

    fn name(&self) -> &'static str {
        "exclusive"
    }
}
