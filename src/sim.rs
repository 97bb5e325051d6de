//! Random-transfer simulation
//!
//! Multi-threaded driver that exercises a [`TransferEngine`] the way the
//! surrounding application would: create a set of accounts, then fire
//! random transfers between random pairs from several worker threads at
//! once. The CLI and the benches both run through here.
//!
//! Each worker gets its own deterministic RNG seeded from the configured
//! seed plus its worker index, so a given configuration replays the same
//! request sequence (the interleaving still varies with scheduling).

use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::core::TransferEngine;
use crate::types::{AccountId, LedgerError, TransferRequest};

/// Workload shape for a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Number of accounts to create before transferring
    pub accounts: usize,

    /// Transfers each worker thread issues
    pub transfers_per_worker: usize,

    /// Number of worker threads
    pub workers: usize,

    /// Transfer amounts are drawn uniformly from `1..=max_amount`
    pub max_amount: u32,

    /// Base RNG seed; worker `n` uses `seed + n`
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            accounts: 4,
            transfers_per_worker: 100,
            workers: num_cpus::get(),
            max_amount: 100,
            seed: 42,
        }
    }
}

/// Outcome tally of a simulation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationSummary {
    /// Transfers that committed
    pub committed: usize,

    /// Transfers that exhausted the retry budget (row-lock strategy only)
    pub retry_exhausted: usize,

    /// Transfers rejected by the validation policy
    pub rejected: usize,
}

impl SimulationSummary {
    /// Total transfers attempted
    pub fn total(&self) -> usize {
        self.committed + self.retry_exhausted + self.rejected
    }

    fn absorb(&mut self, other: SimulationSummary) {
        self.committed += other.committed;
        self.retry_exhausted += other.retry_exhausted;
        self.rejected += other.rejected;
    }
}

/// Create the accounts and run the workload
///
/// Spawns `config.workers` OS threads, each issuing
/// `config.transfers_per_worker` transfers between uniformly random account
/// pairs. Retry exhaustion and policy rejections are tallied, not fatal;
/// any other error aborts the run.
///
/// # Errors
///
/// Returns `ConstraintViolation` for a workload with zero accounts or a
/// zero maximum amount; otherwise propagates the first store-level error
/// any worker encounters (`StoreUnavailable`, `ConstraintViolation`).
pub fn run_simulation(
    engine: &TransferEngine,
    config: &SimulationConfig,
) -> Result<SimulationSummary, LedgerError> {
    if config.accounts == 0 {
        return Err(LedgerError::constraint_violation(
            "simulation requires at least one account",
        ));
    }
    if config.max_amount == 0 {
        return Err(LedgerError::constraint_violation(
            "simulation requires a positive maximum amount",
        ));
    }

    for index in 0..config.accounts {
        engine.store().create_account(&format!("account-{index}"))?;
    }
    let account_ids = engine.store().list_account_ids()?;

    tracing::info!(
        accounts = account_ids.len(),
        workers = config.workers,
        transfers_per_worker = config.transfers_per_worker,
        "starting simulation"
    );

    let results = thread::scope(|scope| {
        let handles: Vec<_> = (0..config.workers)
            .map(|worker_index| {
                let account_ids = &account_ids;
                scope.spawn(move || {
                    run_worker(
                        engine,
                        account_ids,
                        config,
                        config.seed + worker_index as u64,
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("simulation worker panicked"))
            .collect::<Vec<_>>()
    });

    let mut summary = SimulationSummary::default();
    for result in results {
        summary.absorb(result?);
    }

    tracing::info!(
        committed = summary.committed,
        retry_exhausted = summary.retry_exhausted,
        rejected = summary.rejected,
        "simulation finished"
    );
    Ok(summary)
}

/// One worker's share of the workload
fn run_worker(
    engine: &TransferEngine,
    account_ids: &[AccountId],
    config: &SimulationConfig,
    seed: u64,
) -> Result<SimulationSummary, LedgerError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut summary = SimulationSummary::default();

    for _ in 0..config.transfers_per_worker {
        let debit = account_ids[rng.gen_range(0..account_ids.len())];
        let credit = account_ids[rng.gen_range(0..account_ids.len())];
        let amount = Decimal::from(rng.gen_range(1..=config.max_amount));
        let request = TransferRequest::new(debit, credit, amount);

        match engine.transfer(&request) {
            Ok(()) => summary.committed += 1,
            Err(LedgerError::RetryLimitExceeded { .. }) => summary.retry_exhausted += 1,
            Err(
                LedgerError::SelfTransferDenied { .. }
                | LedgerError::InvalidAmount { .. }
                | LedgerError::InsufficientFunds { .. },
            ) => summary.rejected += 1,
            Err(err) => return Err(err),
        }
    }

    Ok(summary)
}
