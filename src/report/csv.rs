//! CSV export for result tables.

use std::io::Write;
use std::path::Path;

use crate::BenchError;
use crate::report::table::{CircuitRow, ResultTable};

/// CSV column headers in deterministic order.
pub const CSV_HEADERS: &[&str] = &[
    "device",
    "circuit",
    "witness_rs_ms",
    "witnesscalc_ms",
    "ark_works_ms",
    "rapidsnark_ms",
    "verify_ms",
    "valid",
];

/// CSV exporter for result tables.
///
/// One row per circuit, with the device repeated on every row so files from
/// several machines can be concatenated.
#[derive(Debug, Clone, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        CsvExporter
    }

    /// Export a table to a CSV file, creating parent directories.
    pub fn export(&self, table: &ResultTable, device: &str, output: &Path) -> Result<(), BenchError> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| BenchError::Message(format!("failed to create directory: {e}")))?;
            }
        }

        let file = std::fs::File::create(output)
            .map_err(|e| BenchError::Message(format!("failed to create file: {e}")))?;

        self.export_to_writer(table, device, file)
    }

    /// Export a table to any writer implementing Write.
    pub fn export_to_writer<W: Write>(&self, table: &ResultTable, device: &str, writer: W) -> Result<(), BenchError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer
            .write_record(CSV_HEADERS)
            .map_err(|e| BenchError::Message(format!("failed to write CSV headers: {e}")))?;

        for row in table.rows() {
            csv_writer
                .write_record(self.row_fields(device, row))
                .map_err(|e| BenchError::Message(format!("failed to write CSV row: {e}")))?;
        }

        csv_writer
            .flush()
            .map_err(|e| BenchError::Message(format!("failed to flush CSV writer: {e}")))?;

        Ok(())
    }

    fn row_fields(&self, device: &str, row: &CircuitRow) -> Vec<String> {
        vec![
            device.to_string(),
            row.circuit.to_string(),
            row.witness_rs_ms.to_string(),
            row.witnesscalc_ms.to_string(),
            row.ark_works_ms.to_string(),
            row.rapidsnark_ms.to_string(),
            row.verify_ms.map(|v| v.to_string()).unwrap_or_default(),
            row.valid.map(|v| v.to_string()).unwrap_or_default(),
        ]
    }
}
