//! Configurable transfer validation policy
//!
//! By default the engine imposes no business rules of its own: it happily
//! transfers zero or negative amounts, transfers from an account to itself,
//! and drives balances negative. Each check is exposed as a policy knob
//! with the permissive behavior as the default; integrators that want
//! stricter semantics opt in.

use rust_decimal::Decimal;

use crate::types::{LedgerError, TransferRequest};

/// Validation policy applied to every transfer
///
/// The default policy accepts everything. Policy rejections are never
/// retried: they are deterministic and would fail again on every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
    /// Permit transfers where the debit and credit account are the same
    ///
    /// A self-transfer is a net no-op on balances but still appends a
    /// transaction record.
    pub allow_self_transfer: bool,

    /// Permit a debit to drive the account's balance below zero
    ///
    /// When false, the debit balance is checked inside the transaction,
    /// after the balance read, so the check sees a locked, consistent value.
    pub allow_negative_balances: bool,

    /// Reject transfers whose amount is zero or negative
    pub require_positive_amount: bool,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        TransferPolicy {
            allow_self_transfer: true,
            allow_negative_balances: true,
            require_positive_amount: false,
        }
    }
}

impl TransferPolicy {
    /// Checks that need no store access, run before a transaction begins
    ///
    /// # Errors
    ///
    /// - `SelfTransferDenied` if the accounts match and self-transfers are
    ///   disallowed
    /// - `InvalidAmount` if a positive amount is required and the request's
    ///   amount is zero or negative
    pub fn check_request(&self, request: &TransferRequest) -> Result<(), LedgerError> {
        if !self.allow_self_transfer && request.debit_account_id == request.credit_account_id {
            return Err(LedgerError::self_transfer_denied(request.debit_account_id));
        }
        if self.require_positive_amount && request.amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(request.amount));
        }
        Ok(())
    }

    /// Overdraft check, run inside the transaction with the locked balance
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` if negative balances are disallowed and the debit
    /// would push the balance below zero
    pub fn check_debit(
        &self,
        request: &TransferRequest,
        debit_balance: Decimal,
    ) -> Result<(), LedgerError> {
        if !self.allow_negative_balances && debit_balance - request.amount < Decimal::ZERO {
            return Err(LedgerError::insufficient_funds(
                request.debit_account_id,
                debit_balance,
                request.amount,
            ));
        }
        Ok(())
    }
}
