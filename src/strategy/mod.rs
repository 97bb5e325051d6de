//! Concurrency-control strategies for executing transfers
//!
//! This module defines the Strategy pattern for the transfer protocol: the
//! sequence of locking, log insert, and balance updates that moves funds
//! between two accounts. Two implementations with very different
//! concurrency profiles can be selected at runtime:
//!
//! - [`ExclusiveLockStrategy`] serializes every transfer system-wide behind
//!   a table lock. Trivially correct, zero parallelism, never retries.
//! - [`RowLockStrategy`] locks only the two involved balance rows, letting
//!   disjoint transfers run in parallel, and retries with linear backoff
//!   when the store aborts it as a deadlock victim.
//!
//! Both strategies guarantee the same postcondition: a successful transfer
//! commits exactly one transaction record and both balance updates
//! atomically; any failure rolls back completely.

pub use crate::cli::StrategyType;

use crate::core::TransferPolicy;
use crate::store::LedgerStore;
use crate::types::{LedgerError, TransferRequest};

pub mod exclusive;
pub mod row_lock;

pub use exclusive::ExclusiveLockStrategy;
pub use row_lock::{RetryConfig, RowLockStrategy};

/// A transfer execution protocol
///
/// Implementations own the whole transactional lifecycle: they begin the
/// transaction, take their locks, stage the log insert and balance writes,
/// and commit - or roll back and decide whether to retry. The engine calls
/// `transfer` once per request.
pub trait TransferStrategy: Send + Sync {
    /// Execute one transfer against the store
    ///
    /// # Arguments
    ///
    /// * `store` - The ledger store to run the transaction against
    /// * `request` - The debit/credit pair and amount to move
    /// * `policy` - Validation policy; the in-transaction overdraft check
    ///   runs after the debit balance has been read under lock
    ///
    /// # Errors
    ///
    /// Any [`LedgerError`]; every error path has rolled back the attempt
    /// before returning, so no partial state is ever visible.
    fn transfer(
        &self,
        store: &dyn LedgerStore,
        request: &TransferRequest,
        policy: &TransferPolicy,
    ) -> Result<(), LedgerError>;

    /// Short name for logs and reports
    fn name(&self) -> &'static str;
}

/// Create a transfer strategy based on the specified strategy type
///
/// Factory selecting the concrete strategy at runtime. The retry
/// configuration only applies to the row-lock strategy; the exclusive
/// strategy never retries (once the table lock is held there is no
/// contention left to retry against).
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<RetryConfig>,
) -> Box<dyn TransferStrategy> {
    match strategy_type {
        StrategyType::Exclusive => Box::new(ExclusiveLockStrategy),
        StrategyType::RowLock => {
            let config = config.unwrap_or_default();
            Box::new(RowLockStrategy::new(config))
        }
    }
}
