//! Result table: per-circuit, per-backend timings and their exports.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{BackendId, CircuitId, TimingRecord};
use crate::engine::{RunEvent, RunReport, StepResult};
use crate::{BenchError, BenchResult};

/// Timings of one circuit; zero means "not run".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitRow {
    pub circuit: CircuitId,
    pub witness_rs_ms: u64,
    pub witnesscalc_ms: u64,
    pub ark_works_ms: u64,
    pub rapidsnark_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
}

impl CircuitRow {
    pub fn new(circuit: CircuitId) -> Self {
        CircuitRow {
            circuit,
            witness_rs_ms: 0,
            witnesscalc_ms: 0,
            ark_works_ms: 0,
            rapidsnark_ms: 0,
            verify_ms: None,
            valid: None,
        }
    }

    pub fn get(&self, backend: BackendId) -> Option<u64> {
        match backend {
            BackendId::WitnessRs => Some(self.witness_rs_ms),
            BackendId::WitnessCalc => Some(self.witnesscalc_ms),
            BackendId::ArkWorks => Some(self.ark_works_ms),
            BackendId::Rapidsnark => Some(self.rapidsnark_ms),
            BackendId::Verifier => self.verify_ms,
        }
    }

    fn set(&mut self, backend: BackendId, ms: u64) {
        match backend {
            BackendId::WitnessRs => self.witness_rs_ms = ms,
            BackendId::WitnessCalc => self.witnesscalc_ms = ms,
            BackendId::ArkWorks => self.ark_works_ms = ms,
            BackendId::Rapidsnark => self.rapidsnark_ms = ms,
            BackendId::Verifier => self.verify_ms = Some(ms),
        }
    }
}

/// JSON document written by [`ResultTable::write_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableExport {
    pub device: String,
    pub generated_at: String,
    pub rows: Vec<CircuitRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    rows: Vec<CircuitRow>,
}

impl Default for ResultTable {
    fn default() -> Self {
        Self::new(&CircuitId::BENCHMARK)
    }
}

fn ms(value: u64) -> String {
    format!("{value} ms")
}

impl ResultTable {
    /// A zeroed table with one row per circuit, in the given order.
    pub fn new(circuits: &[CircuitId]) -> Self {
        ResultTable {
            rows: circuits.iter().copied().map(CircuitRow::new).collect(),
        }
    }

    pub fn rows(&self) -> &[CircuitRow] {
        &self.rows
    }

    /// Store one timing. Returns `false` if the circuit has no row.
    pub fn record(&mut self, timing: TimingRecord) -> bool {
        match self.rows.iter_mut().find(|r| r.circuit == timing.circuit) {
            Some(row) => {
                row.set(timing.backend, timing.duration_ms);
                true
            }
            None => false,
        }
    }

    /// Fold a run event into the table; only finished steps change it.
    pub fn apply(&mut self, event: &RunEvent) {
        if let RunEvent::StepFinished(outcome) = event {
            self.record(outcome.timing());
            if let StepResult::Succeeded { valid: Some(valid), .. } = outcome.result {
                if let Some(row) = self.rows.iter_mut().find(|r| r.circuit == outcome.circuit) {
                    row.valid = Some(valid);
                }
            }
        }
    }

    pub fn apply_report(&mut self, report: &RunReport) {
        for outcome in &report.outcomes {
            self.apply(&RunEvent::StepFinished(outcome.clone()));
        }
    }

    /// Back to all-zero timings.
    pub fn reset(&mut self) {
        for row in &mut self.rows {
            *row = CircuitRow::new(row.circuit);
        }
    }

    pub fn get(&self, circuit: CircuitId, backend: BackendId) -> Option<u64> {
        self.rows
            .iter()
            .find(|r| r.circuit == circuit)
            .and_then(|r| r.get(backend))
    }

    /// One-line summary: the device, then for each circuit its name and the
    /// witness-rs, witnesscalc, ark-works and rapidsnark timings. Every field
    /// is followed by a comma, the last one included.
    pub fn export_summary(&self, device: &str) -> String {
        let mut out = format!("{device},");
        for row in &self.rows {
            out.push_str(&format!(
                " {}, {}, {}, {}, {},",
                row.circuit,
                ms(row.witness_rs_ms),
                ms(row.witnesscalc_ms),
                ms(row.ark_works_ms),
                ms(row.rapidsnark_ms)
            ));
        }
        out
    }

    /// The "Witness Calculation" and "Proof Generation" tables.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("Witness Calculation\n\n");
        out.push_str("| Circuit | witness-rs | witnesscalc |\n|---------|------------|-------------|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.circuit,
                ms(row.witness_rs_ms),
                ms(row.witnesscalc_ms)
            ));
        }

        out.push_str("\nProof Generation\n\n");
        out.push_str("| Circuit | ark-works | rapidsnark |\n|---------|-----------|------------|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.circuit,
                ms(row.ark_works_ms),
                ms(row.rapidsnark_ms)
            ));
        }

        if self.rows.iter().any(|r| r.verify_ms.is_some()) {
            out.push_str("\nVerification\n\n");
            out.push_str("| Circuit | verifier | valid |\n|---------|----------|-------|\n");
            for row in &self.rows {
                let valid = match row.valid {
                    Some(true) => "yes",
                    Some(false) => "no",
                    None => "-",
                };
                out.push_str(&format!(
                    "| {} | {} | {} |\n",
                    row.circuit,
                    row.verify_ms.map(ms).unwrap_or_else(|| "-".into()),
                    valid
                ));
            }
        }

        out
    }

    pub fn to_export(&self, device: &str) -> TableExport {
        let generated_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        TableExport {
            device: device.to_string(),
            generated_at,
            rows: self.rows.clone(),
        }
    }

    pub fn to_json(&self, device: &str) -> BenchResult<String> {
        serde_json::to_string_pretty(&self.to_export(device))
            .map_err(|e| BenchError::Message(format!("failed to serialize results: {e}")))
    }

    pub fn write_json(&self, device: &str, output: &Path) -> BenchResult<()> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(output, self.to_json(device)?)?;
        Ok(())
    }
}
