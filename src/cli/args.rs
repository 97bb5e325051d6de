use crate::core::TransferPolicy;
use crate::sim::SimulationConfig;
use crate::strategy::RetryConfig;
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Run concurrent double-entry transfers against an in-memory ledger
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(
    about = "Run concurrent double-entry transfers against an in-memory ledger",
    long_about = None
)]
pub struct CliArgs {
    /// Concurrency-control strategy for the transfer protocol
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "row-lock",
        help = "Concurrency strategy: 'exclusive' for a table-wide lock or 'row-lock' for row locks with retry"
    )]
    pub strategy: StrategyType,

    /// Number of accounts to create
    #[arg(
        long = "accounts",
        value_name = "COUNT",
        default_value_t = 4,
        help = "Number of zero-balance accounts to create before transferring"
    )]
    pub accounts: usize,

    /// Transfers issued by each worker thread
    #[arg(
        long = "transfers",
        value_name = "COUNT",
        default_value_t = 100,
        help = "Number of transfers each worker issues"
    )]
    pub transfers: usize,

    /// Number of worker threads
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of concurrent workers (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Upper bound for random transfer amounts
    #[arg(
        long = "max-amount",
        value_name = "AMOUNT",
        default_value_t = 100,
        help = "Transfer amounts are drawn from 1..=AMOUNT"
    )]
    pub max_amount: u32,

    /// Base RNG seed for reproducible workloads
    #[arg(long = "seed", value_name = "SEED", default_value_t = 42)]
    pub seed: u64,

    /// Maximum transfer attempts (row-lock strategy only)
    #[arg(
        long = "max-retries",
        value_name = "COUNT",
        help = "Attempts before giving up with RetryLimitExceeded (default: 5)"
    )]
    pub max_retries: Option<u32>,

    /// Backoff unit in milliseconds (row-lock strategy only)
    #[arg(
        long = "base-delay-ms",
        value_name = "MILLIS",
        help = "Retry n sleeps n times this before the next attempt (default: 10)"
    )]
    pub base_delay_ms: Option<u64>,

    /// Reject transfers from an account to itself
    #[arg(long = "deny-self-transfer")]
    pub deny_self_transfer: bool,

    /// Reject debits that would drive a balance below zero
    #[arg(long = "deny-negative-balances")]
    pub deny_negative_balances: bool,

    /// Reject zero or negative transfer amounts
    #[arg(long = "require-positive-amount")]
    pub require_positive_amount: bool,
}

/// Available concurrency-control strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    /// Exclusive table lock, total serialization, no retries
    Exclusive,
    /// Row-level locks with linear-backoff retry on deadlock
    RowLock,
}

impl CliArgs {
    /// Create a RetryConfig from CLI arguments
    ///
    /// Uses the CLI values if provided, falling back to defaults otherwise.
    /// A zero retry budget falls back to the default with a warning.
    pub fn to_retry_config(&self) -> RetryConfig {
        if self.max_retries.is_some() || self.base_delay_ms.is_some() {
            let default = RetryConfig::default();
            RetryConfig::new(
                self.max_retries.unwrap_or(default.max_retries),
                self.base_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(default.base_delay),
            )
        } else {
            RetryConfig::default()
        }
    }

    /// Create a TransferPolicy from the policy flags
    ///
    /// With no flags set this is the default permissive policy.
    pub fn to_policy(&self) -> TransferPolicy {
        TransferPolicy {
            allow_self_transfer: !self.deny_self_transfer,
            allow_negative_balances: !self.deny_negative_balances,
            require_positive_amount: self.require_positive_amount,
        }
    }

    /// Create a SimulationConfig from the workload arguments
    pub fn to_simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            accounts: self.accounts,
            transfers_per_worker: self.transfers,
            workers: self.workers.unwrap_or_else(num_cpus::get),
            max_amount: self.max_amount,
            seed: self.seed,
        }
    }
}
