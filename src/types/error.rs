//! Error types for the ledger engine
//!
//! This module defines all errors that can surface from a transfer attempt.
//!
//! # Error Categories
//!
//! - **Store Errors**: connectivity loss, constraint violations
//! - **Lock Errors**: store-detected deadlocks (retryable) and retry
//!   exhaustion (terminal)
//! - **Policy Errors**: rejections from the configured transfer policy
//!
//! Every error path rolls back the transactional attempt before propagating,
//! so a caller receiving any variant may assume no partial state was left
//! behind. Only [`LedgerError::LockConflict`] is retryable, and only the
//! row-lock strategy retries it.

use rust_decimal::Decimal;
use thiserror::Error;

use super::transaction::AccountId;

/// Main error type for the ledger engine
///
/// Each variant carries enough context to diagnose the failure from a log
/// line alone. A transfer either fully commits or the caller receives one
/// of these - there is no silent failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// The backing store could not be reached or dropped the session
    ///
    /// This is a fatal error for the current transfer; it is not retried.
    #[error("Store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the connectivity failure
        message: String,
    },

    /// A store constraint rejected the operation
    ///
    /// Covers foreign-key style failures such as referencing an account
    /// that does not exist. Not retried.
    #[error("Constraint violation: {message}")]
    ConstraintViolation {
        /// Description of the violated constraint
        message: String,
    },

    /// The store aborted this transaction to resolve a lock deadlock
    ///
    /// Transient by nature: two transfers requested the same rows in
    /// opposite orders and this side was chosen as the victim. The
    /// row-lock strategy retries it with linear backoff; the
    /// exclusive-lock strategy never sees it (a held table lock admits no
    /// contention).
    #[error("Lock conflict: {message}")]
    LockConflict {
        /// Description of the detected conflict
        message: String,
    },

    /// The row-lock strategy exhausted its retry budget
    ///
    /// Terminal. Every attempt was rolled back, so no partial state exists
    /// and no transaction record was appended.
    #[error("Retry limit exceeded after {attempts} attempts")]
    RetryLimitExceeded {
        /// Number of attempts made before giving up
        attempts: u32,
    },

    /// A balance update would overflow the decimal range
    ///
    /// The transfer is rejected and rolled back to keep the ledger
    /// consistent. Not retried: the same amounts would overflow again.
    #[error("Arithmetic overflow in {operation} for account {account_id}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// The account whose balance update overflowed
        account_id: AccountId,
    },

    /// The transfer policy forbids transfers from an account to itself
    #[error("Self transfer denied for account {account_id}")]
    SelfTransferDenied {
        /// The account named as both debit and credit side
        account_id: AccountId,
    },

    /// The transfer policy requires a strictly positive amount
    #[error("Invalid transfer amount {amount}: must be positive")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// The transfer policy forbids driving a balance negative
    #[error(
        "Insufficient funds in account {account_id}: balance {balance}, requested {requested}"
    )]
    InsufficientFunds {
        /// The debit account
        account_id: AccountId,
        /// Balance at the time of the check
        balance: Decimal,
        /// Requested debit amount
        requested: Decimal,
    },
}

impl LedgerError {
    /// Whether this error may be resolved by retrying the whole transfer
    ///
    /// Only lock conflicts are transient; everything else fails the
    /// transfer immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::LockConflict { .. })
    }

    /// Create a StoreUnavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        LedgerError::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create a ConstraintViolation error
    pub fn constraint_violation(message: impl Into<String>) -> Self {
        LedgerError::ConstraintViolation {
            message: message.into(),
        }
    }

    /// Create a LockConflict error
    pub fn lock_conflict(message: impl Into<String>) -> Self {
        LedgerError::LockConflict {
            message: message.into(),
        }
    }

    /// Create a RetryLimitExceeded error
    pub fn retry_limit_exceeded(attempts: u32) -> Self {
        LedgerError::RetryLimitExceeded { attempts }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account_id: AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account_id,
        }
    }

    /// Create a SelfTransferDenied error
    pub fn self_transfer_denied(account_id: AccountId) -> Self {
        LedgerError::SelfTransferDenied { account_id }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal) -> Self {
        LedgerError::InvalidAmount { amount }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account_id: AccountId, balance: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account_id,
            balance,
            requested,
        }
    }
}
