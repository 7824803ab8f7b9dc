//! Single-circuit exploration: native witness, native proof, native
//! verification of the standalone `main` circuit.

use std::path::PathBuf;

use serde::Serialize;

use super::orchestrator::{Orchestrator, RunReport, StepResult};
use crate::backend::{ArtifactLocator, NativeOptions, NativeVerifier, VerifierBackend, graph_pair};
use crate::core::{BackendId, Catalog, CircuitId, SoftDecodeWarning};
use crate::ffi::NativeLibrary;

/// Three timings and the verdict of one exploration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExplorationReport {
    pub witness_ms: u64,
    pub prove_ms: u64,
    pub verify_ms: u64,
    /// `None` when verification did not run to a verdict.
    pub valid: Option<bool>,
    /// `(step, reason)` for every failed step.
    pub failures: Vec<(String, String)>,
    pub warnings: Vec<SoftDecodeWarning>,
}

impl ExplorationReport {
    pub fn from_run(report: &RunReport) -> Self {
        let mut out = ExplorationReport {
            warnings: report.warnings.clone(),
            ..ExplorationReport::default()
        };
        for outcome in report.outcomes.iter().filter(|o| o.circuit == CircuitId::Main) {
            match &outcome.result {
                StepResult::Succeeded {
                    elapsed_ms, valid, ..
                } => match outcome.backend {
                    BackendId::WitnessCalc => out.witness_ms = *elapsed_ms,
                    BackendId::Rapidsnark => out.prove_ms = *elapsed_ms,
                    BackendId::Verifier => {
                        out.verify_ms = *elapsed_ms;
                        out.valid = *valid;
                    }
                    _ => {}
                },
                StepResult::Failed { message, .. } => {
                    out.failures.push((outcome.backend.to_string(), message.clone()));
                }
            }
        }
        out
    }

    pub fn is_verified(&self) -> bool {
        self.valid == Some(true)
    }
}

/// Orchestrator over the exploration catalog with the native
/// `witnesscalc → rapidsnark` pair and the native verifier.
pub fn exploration_orchestrator(
    catalog: Catalog,
    dir: impl Into<PathBuf>,
    library: &NativeLibrary,
    options: NativeOptions,
) -> Orchestrator {
    let locator = ArtifactLocator::new(dir);
    let verifier: Box<dyn VerifierBackend> = Box::new(NativeVerifier::new(locator.clone(), library.clone()));
    Orchestrator::new(catalog, vec![graph_pair(locator, library, options)]).with_verifier(verifier)
}
