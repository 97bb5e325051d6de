//! Ledger Transfer Engine CLI
//!
//! Command-line driver that runs concurrent random transfers against an
//! in-memory ledger and reports the final balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- > balances.csv
//! cargo run -- --strategy exclusive --accounts 8 --workers 4 > balances.csv
//! cargo run -- --strategy row-lock --max-retries 5 --base-delay-ms 10 > balances.csv
//! cargo run -- --deny-negative-balances --require-positive-amount > balances.csv
//! ```
//!
//! The program creates the requested accounts, fires random transfers from
//! the configured worker threads through the selected concurrency strategy,
//! verifies that the sum of all balances is still zero, and writes the
//! final balances as CSV to stdout. Logs go to stderr (`RUST_LOG` filters
//! apply).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (store failure, broken conservation, output error)

use std::process;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_ledger_engine::cli;
use rust_ledger_engine::io::write_balances_csv;
use rust_ledger_engine::sim::run_simulation;
use rust_ledger_engine::store::{LedgerStore, MemoryStore};
use rust_ledger_engine::strategy::create_strategy;
use rust_ledger_engine::TransferEngine;
use tracing_subscriber::EnvFilter;

fn main() {
    // Logs go to stderr so the CSV report on stdout stays machine-readable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::RowLock) {
            Some(args.to_retry_config())
        } else {
            None
        };
        create_strategy(args.strategy, config)
    };

    let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
    let engine = TransferEngine::with_policy(Arc::clone(&store), strategy, args.to_policy());

    let summary = match run_simulation(&engine, &args.to_simulation_config()) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let balances = match store.account_balances() {
        Ok(balances) => balances,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // Conservation check: the ledger is a closed system, so the balances
    // must still sum to zero.
    let sum: Decimal = balances.iter().map(|row| row.balance).sum();
    if sum != Decimal::ZERO {
        eprintln!(
            "Error: conservation violated, balances sum to {} after {} committed transfers",
            sum, summary.committed
        );
        process::exit(1);
    }

    let mut output = std::io::stdout();
    if let Err(e) = write_balances_csv(&balances, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
