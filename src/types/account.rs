//! Account-related types for the ledger engine
//!
//! This module defines the Account structure and the balance row used for
//! reporting final account states.

use super::transaction::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A ledger account
///
/// Created once and immutable thereafter. The identifier is assigned by the
/// store; the engine only ever references identifiers, never names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Store-assigned unique identifier
    pub id: AccountId,

    /// Display name, fixed at creation
    pub name: String,
}

impl Account {
    /// Create a new account with the given identifier and name
    pub fn new(id: AccountId, name: impl Into<String>) -> Self {
        Account {
            id,
            name: name.into(),
        }
    }
}

/// A single row of the balance report
///
/// Every account has exactly one balance row, created atomically with the
/// account and initialized to zero. The sum of all balances is invariant
/// under transfers: the ledger is a closed system, so starting from freshly
/// created accounts the sum is always zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account this balance belongs to
    pub account_id: AccountId,

    /// The account's display name
    pub name: String,

    /// The current signed balance
    ///
    /// Negative balances are permitted unless the transfer policy forbids
    /// them; the default policy performs no overdraft check.
    pub balance: Decimal,
}
