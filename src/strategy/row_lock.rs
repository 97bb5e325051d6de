//! Row-lock transfer strategy with retry on conflict
//!
//! Instead of a global lock, this strategy locks only the two balance rows
//! involved, debit row first, then credit row. Transfers touching disjoint
//! accounts proceed in parallel; transfers sharing an account queue on the
//! row lock.
//!
//! Two transfers can request the same two rows in opposite orders
//! (X to Y racing Y to X), in which case the store detects the deadlock and
//! aborts one side with [`LedgerError::LockConflict`]. The aborted side
//! rolls back, sleeps `base_delay * (attempt_index + 1)` (linear backoff,
//! no jitter), and retries the entire operation from the beginning, up to
//! [`RetryConfig::max_retries`] attempts. Exhaustion surfaces as
//! [`LedgerError::RetryLimitExceeded`]. Non-conflict errors are never
//! retried.
//!
//! # Protocol
//!
//! ```text
//! Idle -> RowsLocked -> RecordInserted -> BalancesUpdated -> Committed
//!            |                 |
//!            +-- conflict -----+--> rollback, backoff, retry from Idle
//! ```

use std::thread;
use std::time::Duration;

use crate::core::TransferPolicy;
use crate::store::{LedgerStore, StoreTransaction};
use crate::strategy::TransferStrategy;
use crate::types::{LedgerError, TransferRequest};

/// Default maximum number of attempts before giving up
const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default backoff unit; the n-th retry sleeps n times this
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(10);

/// Retry configuration for the row-lock strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts allowed, including the first one
    pub max_retries: u32,

    /// Backoff unit: attempt `n` (zero-based) sleeps `base_delay * (n + 1)`
    /// before the next attempt
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration, falling back to defaults for a zero
    /// attempt budget
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        let max_retries = if max_retries == 0 {
            tracing::warn!(
                "max_retries of 0 would never attempt a transfer, using default {}",
                DEFAULT_MAX_RETRIES
            );
            DEFAULT_MAX_RETRIES
        } else {
            max_retries
        };
        RetryConfig {
            max_retries,
            base_delay,
        }
    }
}

/// Transfer strategy using row-level locks and retry on deadlock
#[derive(Debug, Clone, Copy, Default)]
pub struct RowLockStrategy {
    config: RetryConfig,
}

impl RowLockStrategy {
    /// Create a row-lock strategy with the given retry configuration
    pub fn new(config: RetryConfig) -> Self {
        RowLockStrategy { config }
    }

    /// One attempt of the transfer protocol, between begin and
    /// commit/rollback
    fn apply(
        txn: &mut dyn StoreTransaction,
        request: &TransferRequest,
        policy: &TransferPolicy,
    ) -> Result<(), LedgerError> {
        // Lock order is fixed: debit row, then credit row. The store aborts
        // one side if two transfers race in opposite orders.
        let debit_balance = txn.read_balance(request.debit_account_id, true)?;
        txn.read_balance(request.credit_account_id, true)?;

        policy.check_debit(request, debit_balance)?;

        txn.append_transaction(
            request.debit_account_id,
            request.credit_account_id,
            request.amount,
        )?;

        let new_debit = debit_balance
            .checked_sub(request.amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("debit", request.debit_account_id))?;
        txn.write_balance(request.debit_account_id, new_debit)?;

        // Re-read instead of reusing the locking read: when the two accounts
        // coincide this picks up the staged debit, so the transfer nets to
        // zero rather than double-applying.
        let credit_balance = txn.read_balance(request.credit_account_id, false)?;
        let new_credit = credit_balance
            .checked_add(request.amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("credit", request.credit_account_id))?;
        txn.write_balance(request.credit_account_id, new_credit)?;

        Ok(())
    }

    /// One full attempt: begin, apply, commit or rollback
    fn attempt(
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
}

impl TransferStrategy for RowLockStrategy {
    fn transfer(
        &self,
        store: &dyn LedgerStore,
        request: &TransferRequest,
        policy: &TransferPolicy,
    ) -> Result<(), LedgerError> {
        for attempt_index in 0..self.config.max_retries {
            match self.attempt(store, request, policy) {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() => {
                    if attempt_index + 1 == self.config.max_retries {
                        break;
                    }
                    let delay = self.config.base_delay * (attempt_index + 1);
                    tracing::warn!(
                        attempt = attempt_index + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        %err,
                        "lock conflict, backing off and retrying"
                    );
                    thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
        Err(LedgerError::retry_limit_exceeded(self.config.max_retries))
    }

    fn name(&self) -> &'static str {
        "row-lock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::AccountId;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_retry_config_zero_attempts_falls_back_to_default() {
        let config = RetryConfig::new(0, Duration::from_millis(1));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_transfer_commits_record_and_both_balances() {
        let store = MemoryStore::new();
        let alice = store.create_account("alice").unwrap();
        let bob = store.create_account("bob").unwrap();

        let strategy = RowLockStrategy::default();
        let request = TransferRequest::new(alice, bob, Decimal::from(40));
        strategy
            .transfer(&store, &request, &TransferPolicy::default())
            .unwrap();

        let balances = store.account_balances().unwrap();
        assert_eq!(balances[0].balance, Decimal::from(-40));
        assert_eq!(balances[1].balance, Decimal::from(40));
        assert_eq!(store.transaction_log().unwrap().len(), 1);
    }

    /// Two transfers over four distinct accounts run concurrently and both
    /// commit; the result matches serial execution in either order.
    #[test]
    fn test_disjoint_transfers_proceed_in_parallel() {
        let store = Arc::new(MemoryStore::new());
        let ids: Vec<AccountId> = (0..4)
            .map(|i| store.create_account(&format!("acct-{i}")).unwrap())
            .collect();

        thread::scope(|scope| {
            for pair in [(ids[0], ids[1]), (ids[2], ids[3])] {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    let strategy = RowLockStrategy::default();
                    for _ in 0..50 {
                        let request = TransferRequest::new(pair.0, pair.1, Decimal::ONE);
                        strategy
                            .transfer(store.as_ref(), &request, &TransferPolicy::default())
                            .unwrap();
                    }
                });
            }
        });

        let balances = store.account_balances().unwrap();
        assert_eq!(balances[0].balance, Decimal::from(-50));
        assert_eq!(balances[1].balance, Decimal::from(50));
        assert_eq!(balances[2].balance, Decimal::from(-50));
        assert_eq!(balances[3].balance, Decimal::from(50));
        assert_eq!(store.transaction_log().unwrap().len(), 100);
    }

    /// Opposite-direction transfers on the same account pair: each either
    /// commits or fails with RetryLimitExceeded, and the combined balance
    /// of the pair never changes.
    #[test]
    fn test_opposite_direction_transfers_conserve_funds() {
        let store = Arc::new(MemoryStore::new());
        let a = store.create_account("a").unwrap();
        let b = store.create_account("b").unwrap();

        let committed = thread::scope(|scope| {
            let handles: Vec<_> = [(a, b), (b, a)]
                .into_iter()
                .map(|pair| {
                    let store = Arc::clone(&store);
                    scope.spawn(move || {
                        let strategy = RowLockStrategy::new(RetryConfig {
                            max_retries: 5,
                            base_delay: Duration::from_millis(1),
                        });
                        let mut committed = 0usize;
                        for _ in 0..100 {
                            let request = TransferRequest::new(pair.0, pair.1, Decimal::ONE);
                            match strategy.transfer(
                                store.as_ref(),
                                &request,
                                &TransferPolicy::default(),
                            ) {
                                Ok(()) => committed += 1,
                                Err(LedgerError::RetryLimitExceeded { attempts }) => {
                                    assert_eq!(attempts, 5);
                                }
                                Err(other) => panic!("unexpected error: {other}"),
                            }
                        }
                        committed
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .sum::<usize>()
        });

        let balances = store.account_balances().unwrap();
        let sum: Decimal = balances.iter().map(|row| row.balance).sum();
        assert_eq!(sum, Decimal::ZERO);

        // Exactly one record per committed transfer, none for failures.
        assert_eq!(store.transaction_log().unwrap().len(), committed);
    }

    #[test]
    fn test_overflowing_credit_is_rejected_not_retried() {
        let store = MemoryStore::new();
        let alice = store.create_account("alice").unwrap();
        let bob = store.create_account("bob").unwrap();

        let mut txn = store.begin().unwrap();
        txn.write_balance(bob, Decimal::MAX).unwrap();
        txn.commit().unwrap();

        let strategy = RowLockStrategy::default();
        let request = TransferRequest::new(alice, bob, Decimal::MAX);
        let result = strategy.transfer(&store, &request, &TransferPolicy::default());

        assert_eq!(result, Err(LedgerError::arithmetic_overflow("credit", bob)));

        // Rolled back like any other non-retryable failure.
        let balances = store.account_balances().unwrap();
        assert_eq!(balances[0].balance, Decimal::ZERO);
        assert_eq!(balances[1].balance, Decimal::MAX);
        assert!(store.transaction_log().unwrap().is_empty());
    }

    #[test]
    fn test_non_conflict_error_is_not_retried() {
        let store = MemoryStore::new();
        let alice = store.create_account("alice").unwrap();

        let strategy = RowLockStrategy::default();
        let request = TransferRequest::new(alice, 999, Decimal::ONE);
        let result = strategy.transfer(&store, &request, &TransferPolicy::default());

        assert!(matches!(result, Err(LedgerError::ConstraintViolation { .. })));
        assert!(store.transaction_log().unwrap().is_empty());
    }
}
