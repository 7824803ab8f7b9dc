use std::path::PathBuf;

use crate::artifacts_cmd::{catalog_for, open_store};
use crate::config::BenchConfig;
use crate::engine::{ExplorationReport, exploration_orchestrator};
use crate::ffi::NativeLibrary;
use crate::run_cmd::prepare;
use crate::{BenchError, BenchResult};

/// Witness, prove and verify the standalone circuit with the native libraries.
pub fn run(config: &BenchConfig, download: bool, json: Option<PathBuf>) -> BenchResult<()> {
    let catalog = catalog_for(config, true);
    let store = open_store(config, &catalog);
    let library = NativeLibrary::linked();
    let mut orchestrator =
        exploration_orchestrator(catalog, &config.artifacts_dir, &library, config.native_options());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(prepare(&mut orchestrator, &store, download))?;

    let run = orchestrator.run()?;
    let report = ExplorationReport::from_run(&run);

    println!("Witness (witnesscalc): {} ms", report.witness_ms);
    println!("Proof (rapidsnark):    {} ms", report.prove_ms);
    println!("Verify:                {} ms", report.verify_ms);
    match report.valid {
        Some(valid) => println!("Proof valid: {valid}"),
        None => println!("Proof valid: not checked"),
    }
    for (step, reason) in &report.failures {
        println!("  {step} failed: {reason}");
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }

    if let Some(path) = json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| BenchError::Message(format!("failed to serialize report: {e}")))?;
        std::fs::write(&path, text)?;
        println!("Wrote JSON report to {}", path.display());
    }
    Ok(())
}
