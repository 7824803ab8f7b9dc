//! Reporting: the result table, its terminal rendering and its exports.
//!
//! This module provides:
//! - `ResultTable`: per-circuit, per-backend timings folded from run events
//! - The one-line summary export
//! - JSON and CSV exports

pub mod csv;
pub mod table;

// Re-export key types
pub use self::csv::{CSV_HEADERS, CsvExporter};
pub use table::{CircuitRow, ResultTable, TableExport};
