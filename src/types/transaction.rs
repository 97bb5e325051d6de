//! Transfer-related types for the ledger engine
//!
//! This module defines the identifiers, the transfer request, and the
//! immutable transaction log record used throughout the system.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account identifier
///
/// Opaque and store-assigned: callers obtain identifiers from
/// `LedgerStore::create_account` and never invent their own.
pub type AccountId = u64;

/// A request to move `amount` from one account to another
///
/// The request carries no validation of its own. Whether a self-transfer,
/// a non-positive amount, or an overdraft is acceptable is decided by the
/// [`TransferPolicy`](crate::core::TransferPolicy) the engine was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    /// The account to debit (balance decreases by `amount`)
    pub debit_account_id: AccountId,

    /// The account to credit (balance increases by `amount`)
    pub credit_account_id: AccountId,

    /// The signed amount to move
    pub amount: Decimal,
}

impl TransferRequest {
    /// Create a new transfer request
    pub fn new(debit_account_id: AccountId, credit_account_id: AccountId, amount: Decimal) -> Self {
        TransferRequest {
            debit_account_id,
            credit_account_id,
            amount,
        }
    }
}

/// Immutable transaction log entry
///
/// One record is appended per successfully committed transfer and is never
/// updated or deleted. The record's position in the log is its implicit
/// timestamp: the store appends in commit order.
///
/// The absence of a record is the ground truth that a transfer did not
/// happen - callers must treat any non-success result from the engine as
/// "no funds moved".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The account that was debited
    pub debit_account_id: AccountId,

    /// The account that was credited
    pub credit_account_id: AccountId,

    /// The amount that moved
    pub amount: Decimal,
}
