use std::path::PathBuf;

use tracing::warn;

use crate::artifacts::ArtifactStore;
use crate::artifacts_cmd::{catalog_for, open_store, print_download_summary};
use crate::backend::{
    ArtifactLocator, MockConfig, MockVerifier, NativeVerifier, VerifierBackend, mock_pairs,
    native_pairs,
};
use crate::config::BenchConfig;
use crate::core::RunState;
use crate::engine::{Orchestrator, RunEvent, RunReport, StepResult};
use crate::ffi::NativeLibrary;
use crate::report::{CsvExporter, ResultTable};
use crate::{BenchError, BenchResult};

#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Fetch missing artifacts before running.
    pub download: bool,
    /// Add the verify step.
    pub verify: bool,
    /// Use mock backends instead of the native libraries.
    pub mock: bool,
    pub json: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

fn build_orchestrator(config: &BenchConfig, args: &RunArgs) -> Orchestrator {
    let catalog = catalog_for(config, false);
    let verify = args.verify || config.verify;

    if args.mock {
        let mock = MockConfig::new();
        let orchestrator = Orchestrator::new(catalog, mock_pairs(&mock));
        return if verify {
            orchestrator.with_verifier(Box::new(MockVerifier::new(mock)))
        } else {
            orchestrator
        };
    }

    let library = NativeLibrary::linked();
    let orchestrator = Orchestrator::new(
        catalog,
        native_pairs(&config.artifacts_dir, &library, config.native_options()),
    );
    if verify {
        let verifier: Box<dyn VerifierBackend> = Box::new(NativeVerifier::new(
            ArtifactLocator::new(&config.artifacts_dir),
            library,
        ));
        orchestrator.with_verifier(verifier)
    } else {
        orchestrator
    }
}

/// Bring the orchestrator to `ArtifactsReady`, fetching if asked to.
pub async fn prepare(orchestrator: &mut Orchestrator, store: &ArtifactStore, download: bool) -> BenchResult<()> {
    if download {
        let summary = orchestrator.request_artifacts(store).await?;
        print_download_summary(&summary);
    } else {
        orchestrator.sync_artifacts(store)?;
    }

    if orchestrator.state() != RunState::ArtifactsReady {
        return Err(BenchError::PrerequisiteMissing(format!(
            "missing artifacts in {}: {} (rerun with --download)",
            store.dir().display(),
            store.missing().join(", ")
        )));
    }
    Ok(())
}

fn print_step(event: &RunEvent) {
    match event {
        RunEvent::StepFinished(outcome) => match &outcome.result {
            StepResult::Succeeded {
                elapsed_ms, valid, ..
            } => match valid {
                Some(valid) => println!(
                    "  {:<10} {:<12} {elapsed_ms} ms (valid: {valid})",
                    outcome.circuit, outcome.backend
                ),
                None => println!("  {:<10} {:<12} {elapsed_ms} ms", outcome.circuit, outcome.backend),
            },
            StepResult::Failed { kind, message } => println!(
                "  {:<10} {:<12} failed ({kind}): {message}",
                outcome.circuit, outcome.backend
            ),
        },
        RunEvent::Warning(warning) => println!("  warning: {warning}"),
        RunEvent::StateChanged { .. } => {}
    }
}

/// Run the benchmark on a background worker, folding events into a table.
pub async fn run_async(orchestrator: Orchestrator, table: &mut ResultTable) -> BenchResult<(Orchestrator, RunReport)> {
    let (mut events, handle) = orchestrator.spawn_run();
    while let Some(event) = events.recv().await {
        print_step(&event);
        table.apply(&event);
    }
    let (orchestrator, result) = handle
        .await
        .map_err(|e| BenchError::Message(format!("benchmark worker failed: {e}")))?;
    Ok((orchestrator, result?))
}

pub fn run(config: &BenchConfig, args: RunArgs) -> BenchResult<()> {
    let device = config.device_label();
    let mut orchestrator = build_orchestrator(config, &args);
    let store = open_store(config, orchestrator.catalog());
    let mut table = ResultTable::default();

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(async {
        prepare(&mut orchestrator, &store, args.download).await?;
        let (_orchestrator, report) = run_async(orchestrator, &mut table).await?;
        Ok::<_, BenchError>(report)
    })?;

    println!();
    print!("{}", table.render());
    println!();
    println!("{}", table.export_summary(&device));

    let failed = report.failures().count();
    if failed > 0 {
        warn!(failed, "some steps failed; their timings are reported as 0 ms");
    }

    if let Some(path) = &args.json {
        table.write_json(&device, path)?;
        println!("Wrote JSON results to {}", path.display());
    }
    if let Some(path) = &args.csv {
        CsvExporter::new().export(&table, &device, path)?;
        println!("Wrote CSV results to {}", path.display());
    }
    Ok(())
}
