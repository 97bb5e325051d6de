//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account and balance-report types
//! - `transaction`: Transfer requests, log records, and identifiers
//! - `error`: Error types for the ledger engine

pub mod account;
pub mod error;
pub mod transaction;

pub use account::{Account, AccountBalance};
pub use error::LedgerError;
pub use transaction::{AccountId, TransactionRecord, TransferRequest};
