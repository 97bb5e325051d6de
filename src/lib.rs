//! Ledger Transfer Engine Library
//! # Overview
//!
//! This library maintains a financial ledger - accounts, balances, and an
//! append-only transfer log - and guarantees that money is never created or
//! destroyed under concurrent transfers: the sum of all balances is
//! invariant.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (accounts, transfer requests, log records, errors)
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Transfer execution against injected collaborators
//!   - [`core::policy`] - Configurable request validation
//! - [`store`] - The ledger store contract and its in-memory implementation
//! - [`strategy`] - Pluggable concurrency-control strategies
//! - [`sim`] - Multi-threaded random-transfer driver
//! - [`io`] - CSV output of the final balance report
//!
//! # Concurrency Strategies
//!
//! The transfer protocol runs under one of two strategies:
//!
//! - **Exclusive**: lock the entire balance table, serializing every
//!   transfer system-wide. Trivially correct, zero parallelism, any error
//!   is immediately fatal.
//! - **Row-lock**: lock only the two balance rows involved, letting
//!   disjoint transfers run in parallel. A store-detected deadlock aborts
//!   one side, which retries with linear backoff up to a configurable
//!   attempt budget.
//!
//! # Invariants
//!
//! - A committed transfer is exactly one log record plus both balance
//!   updates, applied atomically; a failed transfer leaves no trace.
//! - No reader ever observes a debit without its matching credit.
//! - Starting from freshly created accounts, the sum of all balances is
//!   always zero.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod sim;
pub mod store;
pub mod strategy;
pub mod types;

pub use crate::core::{TransferEngine, TransferPolicy};
pub use io::write_balances_csv;
pub use sim::{run_simulation, SimulationConfig, SimulationSummary};
pub use store::{LedgerStore, MemoryStore, StoreTransaction};
pub use strategy::{create_strategy, RetryConfig, TransferStrategy};
pub use types::{
    Account, AccountBalance, AccountId, LedgerError, TransactionRecord, TransferRequest,
};
