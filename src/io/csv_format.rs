//! CSV output of the final balance report
//!
//! The CLI writes the end-of-run account balances to stdout as CSV, one row
//! per account, sorted by account identifier for deterministic output.

use crate::types::AccountBalance;
use std::io::Write;

/// Write the balance report to CSV format
///
/// Writes balances with columns: account_id, name, balance. Rows are
/// sorted by account identifier for deterministic output.
///
/// # Arguments
///
/// * `balances` - Slice of balance rows to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_balances_csv(
    balances: &[AccountBalance],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    let mut sorted_balances = balances.to_vec();
    sorted_balances.sort_by_key(|row| row.account_id);

    for row in &sorted_balances {
        writer
            .serialize(row)
            .map_err(|e| format!("Failed to write balance record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
