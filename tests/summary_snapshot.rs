//! Snapshot tests for the summary line, the rendered tables and the exports.
//!
//! These tests verify that result output is:
//! - Deterministic for a fixed set of timings
//! - In witness-rs, witnesscalc, ark-works, rapidsnark column order
//! - Zero for every step that did not run

use circom_bench::backend::{MockConfig, mock_pairs};
use circom_bench::core::{BackendId, Catalog, CircuitId, TimingRecord};
use circom_bench::engine::{Orchestrator, RunEvent, StepOutcome, StepResult};
use circom_bench::report::{CSV_HEADERS, CsvExporter, ResultTable, TableExport};

/// A table with distinct timings in every cell.
fn make_fixed_table() -> ResultTable {
    let mut table = ResultTable::default();
    let timings = [
        (CircuitId::Keccak256, [12, 5, 410, 98]),
        (CircuitId::Sha256, [21, 9, 530, 120]),
        (CircuitId::Rsa, [48, 17, 1600, 402]),
    ];
    for (circuit, cells) in timings {
        for (backend, ms) in BackendId::SUMMARY_ORDER.into_iter().zip(cells) {
            assert!(table.record(TimingRecord::new(circuit, backend, ms)));
        }
    }
    table
}

#[test]
fn test_summary_line_snapshot() {
    let summary = make_fixed_table().export_summary("Pixel 8");
    assert_eq!(
        summary,
        "Pixel 8, keccak256, 12 ms, 5 ms, 410 ms, 98 ms, \
         sha256, 21 ms, 9 ms, 530 ms, 120 ms, \
         rsa, 48 ms, 17 ms, 1600 ms, 402 ms,"
    );
}

#[test]
fn test_summary_of_empty_table() {
    let summary = ResultTable::default().export_summary("dev");
    assert_eq!(
        summary,
        "dev, keccak256, 0 ms, 0 ms, 0 ms, 0 ms, sha256, 0 ms, 0 ms, 0 ms, 0 ms, rsa, 0 ms, 0 ms, 0 ms, 0 ms,"
    );
}

#[test]
fn test_render_snapshot() {
    let rendered = make_fixed_table().render();
    let expected = "\
Witness Calculation

| Circuit | witness-rs | witnesscalc |
|---------|------------|-------------|
| keccak256 | 12 ms | 5 ms |
| sha256 | 21 ms | 9 ms |
| rsa | 48 ms | 17 ms |

Proof Generation

| Circuit | ark-works | rapidsnark |
|---------|-----------|------------|
| keccak256 | 410 ms | 98 ms |
| sha256 | 530 ms | 120 ms |
| rsa | 1600 ms | 402 ms |
";
    assert_eq!(rendered, expected);
}

#[test]
fn test_render_is_deterministic() {
    let table = make_fixed_table();
    assert_eq!(table.render(), table.render());
    assert_eq!(table.export_summary("x"), make_fixed_table().export_summary("x"));
}

#[test]
fn test_failed_step_reads_as_zero() {
    let mut table = make_fixed_table();
    table.apply(&RunEvent::StepFinished(StepOutcome {
        circuit: CircuitId::Sha256,
        backend: BackendId::Rapidsnark,
        result: StepResult::Failed {
            kind: "ProofGenerationFailed".into(),
            message: "status 1: out of memory".into(),
        },
    }));
    assert_eq!(table.get(CircuitId::Sha256, BackendId::Rapidsnark), Some(0));
    assert!(table.export_summary("d").contains(" sha256, 21 ms, 9 ms, 530 ms, 0 ms,"));
}

#[test]
fn test_verification_section_appears_with_verdicts() {
    let mut table = ResultTable::new(&[CircuitId::Main]);
    table.apply(&RunEvent::StepFinished(StepOutcome {
        circuit: CircuitId::Main,
        backend: BackendId::Verifier,
        result: StepResult::Succeeded {
            elapsed_ms: 6,
            clock: circom_bench::core::Clock::WallClock,
            valid: Some(true),
        },
    }));
    let rendered = table.render();
    assert!(rendered.contains("\nVerification\n"));
    assert!(rendered.contains("| main | 6 ms | yes |"));
}

#[test]
fn test_mock_run_summary() {
    let config = MockConfig::new().with_witness_ms(7).with_prove_ms(70);
    let mut orchestrator = Orchestrator::new(Catalog::reference("https://keys.test/"), mock_pairs(&config));
    let dir = tempfile::tempdir().unwrap();
    for artifact in orchestrator.catalog().distinct_artifacts() {
        std::fs::write(dir.path().join(artifact), b"artifact").unwrap();
    }
    let store = circom_bench::artifacts::ArtifactStore::new(
        dir.path(),
        orchestrator.catalog(),
        std::sync::Arc::new(circom_bench::artifacts::HttpFetcher::new()),
    );
    orchestrator.sync_artifacts(&store).unwrap();

    let mut table = ResultTable::default();
    table.apply_report(&orchestrator.run().unwrap());
    assert_eq!(
        table.export_summary("ci"),
        "ci, keccak256, 7 ms, 7 ms, 70 ms, 70 ms, sha256, 7 ms, 7 ms, 70 ms, 70 ms, rsa, 7 ms, 7 ms, 70 ms, 70 ms,"
    );
}

#[test]
fn test_csv_and_json_exports() {
    let table = make_fixed_table();

    let mut out = Vec::new();
    CsvExporter::new().export_to_writer(&table, "Pixel 8", &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], CSV_HEADERS.join(","));
    assert_eq!(lines[3], "Pixel 8,rsa,48,17,1600,402,,");

    let json = table.to_json("Pixel 8").unwrap();
    let export: TableExport = serde_json::from_str(&json).unwrap();
    assert_eq!(export.device, "Pixel 8");
    assert_eq!(export.rows.len(), 3);
    assert_eq!(export.rows[2].ark_works_ms, 1600);
    assert!(!export.generated_at.is_empty());
}
