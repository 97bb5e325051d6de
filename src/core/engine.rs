//! Transfer engine
//!
//! This module provides the TransferEngine that executes double-entry
//! transfers against a [`LedgerStore`] under a configured concurrency
//! strategy and validation policy.
//!
//! The engine holds no mutable state of its own: all concurrency
//! coordination happens inside the store via locks, and every dependency is
//! injected explicitly. One engine instance can serve many threads.

use std::sync::Arc;

use crate::core::TransferPolicy;
use crate::store::LedgerStore;
use crate::strategy::TransferStrategy;
use crate::types::{LedgerError, TransferRequest};

/// Executes transfers against a ledger store
///
/// The engine composes three injected collaborators:
/// - the [`LedgerStore`] holding accounts, balances, and the log
/// - a [`TransferStrategy`] deciding how concurrent transfers coordinate
/// - a [`TransferPolicy`] deciding which requests are acceptable
///
/// A successful [`transfer`](Self::transfer) commits exactly one transaction
/// record and both balance updates atomically. Any error means nothing was
/// committed.
pub struct TransferEngine {
    store: Arc<dyn LedgerStore>,
    strategy: Box<dyn TransferStrategy>,
    policy: TransferPolicy,
}

impl TransferEngine {
    /// Create an engine with the default (permissive) policy
    pub fn new(store: Arc<dyn LedgerStore>, strategy: Box<dyn TransferStrategy>) -> Self {
        Self::with_policy(store, strategy, TransferPolicy::default())
    }

    /// Create an engine with an explicit validation policy
    pub fn with_policy(
        store: Arc<dyn LedgerStore>,
        strategy: Box<dyn TransferStrategy>,
        policy: TransferPolicy,
    ) -> Self {
        TransferEngine {
            store,
            strategy,
            policy,
        }
    }

    /// The store this engine runs against
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Move `request.amount` from the debit account to the credit account
    ///
    /// Runs the policy's store-free checks, then delegates to the configured
    /// strategy, which owns the transactional protocol (locking, record
    /// insert, balance updates, commit, and any retries).
    ///
    /// # Errors
    ///
    /// - policy errors (`SelfTransferDenied`, `InvalidAmount`,
    ///   `InsufficientFunds`), never retried
    /// - `ConstraintViolation` for unknown accounts
    /// - `ArithmeticOverflow` when a balance update would leave the
    ///   representable range
    /// - `RetryLimitExceeded` when the row-lock strategy exhausts its
    ///   attempts
    /// - `StoreUnavailable` for connectivity failures
    ///
    /// Every error path has rolled back before returning: callers must
    /// treat any `Err` as "the transfer did not happen".
    pub fn transfer(&self, request: &TransferRequest) -> Result<(), LedgerError> {
        self.policy.check_request(request)?;
        self.strategy
            .transfer(self.store.as_ref(), request, &self.policy)
            .inspect_err(|err| {
                tracing::error!(
                    strategy = self.strategy.name(),
                    debit = request.debit_account_id,
                    credit = request.credit_account_id,
                    %request.amount,
                    %err,
                    "transfer failed"
                );
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::strategy::{create_strategy, StrategyType};
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn engine_with(policy: TransferPolicy, strategy: StrategyType) -> TransferEngine {
        let store = Arc::new(MemoryStore::new());
        store.create_account("alice").unwrap();
        store.create_account("bob").unwrap();
        TransferEngine::with_policy(store, create_strategy(strategy, None), policy)
    }

    #[rstest]
    fn test_transfer_moves_funds_and_appends_one_record(
        #[values(StrategyType::Exclusive, StrategyType::RowLock)] strategy: StrategyType,
    ) {
        let engine = engine_with(TransferPolicy::default(), strategy);
        let request = TransferRequest::new(1, 2, Decimal::from(30));

        engine.transfer(&request).unwrap();

        let balances = engine.store().account_balances().unwrap();
        assert_eq!(balances[0].balance, Decimal::from(-30));
        assert_eq!(balances[1].balance, Decimal::from(30));

        let log = engine.store().transaction_log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].debit_account_id, 1);
        assert_eq!(log[0].credit_account_id, 2);
        assert_eq!(log[0].amount, Decimal::from(30));
    }

    #[rstest]
    fn test_default_policy_permits_self_transfer_and_negative_balances(
        #[values(StrategyType::Exclusive, StrategyType::RowLock)] strategy: StrategyType,
    ) {
        let engine = engine_with(TransferPolicy::default(), strategy);

        // Self-transfer: net no-op on balances, but one record appended.
        engine
            .transfer(&TransferRequest::new(1, 1, Decimal::from(10)))
            .unwrap();
        let balances = engine.store().account_balances().unwrap();
        assert_eq!(balances[0].balance, Decimal::ZERO);
        assert_eq!(engine.store().transaction_log().unwrap().len(), 1);

        // Overdraft permitted by default.
        engine
            .transfer(&TransferRequest::new(1, 2, Decimal::from(1000)))
            .unwrap();
        let balances = engine.store().account_balances().unwrap();
        assert_eq!(balances[0].balance, Decimal::from(-1000));
    }

    #[rstest]
    fn test_policy_rejections_commit_nothing(
        #[values(StrategyType::Exclusive, StrategyType::RowLock)] strategy: StrategyType,
    ) {
        let policy = TransferPolicy {
            allow_self_transfer: false,
            allow_negative_balances: false,
            require_positive_amount: true,
        };
        let engine = engine_with(policy, strategy);

        let self_transfer = TransferRequest::new(1, 1, Decimal::from(10));
        assert_eq!(
            engine.transfer(&self_transfer),
            Err(LedgerError::self_transfer_denied(1))
        );

        let zero_amount = TransferRequest::new(1, 2, Decimal::ZERO);
        assert!(matches!(
            engine.transfer(&zero_amount),
            Err(LedgerError::InvalidAmount { .. })
        ));

        // Overdraft: accounts start at zero, so any positive debit fails.
        let overdraft = TransferRequest::new(1, 2, Decimal::from(5));
        assert!(matches!(
            engine.transfer(&overdraft),
            Err(LedgerError::InsufficientFunds { .. })
        ));

        // Nothing committed on any rejection path.
        assert!(engine.store().transaction_log().unwrap().is_empty());
        let balances = engine.store().account_balances().unwrap();
        assert!(balances.iter().all(|row| row.balance == Decimal::ZERO));
    }

    #[rstest]
    fn test_unknown_account_rolls_back(
        #[values(StrategyType::Exclusive, StrategyType::RowLock)] strategy: StrategyType,
    ) {
        let engine = engine_with(TransferPolicy::default(), strategy);

        let request = TransferRequest::new(1, 999, Decimal::from(10));
        assert!(matches!(
            engine.transfer(&request),
            Err(LedgerError::ConstraintViolation { .. })
        ));

        assert!(engine.store().transaction_log().unwrap().is_empty());
        let balances = engine.store().account_balances().unwrap();
        assert!(balances.iter().all(|row| row.balance == Decimal::ZERO));
    }

    /// The worked example: seed A with 100 from a reserve account, then
    /// transfer 30 to B and 10 back.
    #[rstest]
    fn test_worked_example(
        #[values(StrategyType::Exclusive, StrategyType::RowLock)] strategy: StrategyType,
    ) {
        let store = Arc::new(MemoryStore::new());
        let reserve = store.create_account("reserve").unwrap();
        let a = store.create_account("A").unwrap();
        let b = store.create_account("B").unwrap();
        let engine = TransferEngine::new(store, create_strategy(strategy, None));

        engine
            .transfer(&TransferRequest::new(reserve, a, Decimal::from(100)))
            .unwrap();
        engine
            .transfer(&TransferRequest::new(a, b, Decimal::from(30)))
            .unwrap();
        engine
            .transfer(&TransferRequest::new(b, a, Decimal::from(10)))
            .unwrap();

        let balances = engine.store().account_balances().unwrap();
        assert_eq!(balances[1].balance, Decimal::from(80)); // A
        assert_eq!(balances[2].balance, Decimal::from(20)); // B
        assert_eq!(engine.store().transaction_log().unwrap().len(), 3);

        // Conservation: the ledger is a closed system.
        let sum: Decimal = balances.iter().map(|row| row.balance).sum();
        assert_eq!(sum, Decimal::ZERO);
    }
}
