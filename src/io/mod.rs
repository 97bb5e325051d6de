//! I/O module
//!
//! Handles CSV output of the final balance report.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (balance report serialization)

pub mod csv_format;

pub use csv_format::write_balances_csv;
