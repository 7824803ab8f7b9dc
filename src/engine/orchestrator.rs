//! Benchmark orchestration: the run state machine and per-circuit sequencing.
//!
//! For each circuit, in catalog order, the orchestrator runs every
//! registered [`BackendPair`] (witness step, then the prover fed with that
//! witness), and finally the verifier when one is registered and the circuit
//! carries a verification key. A failing step never stops the run: its
//! outcome is recorded, logged at `warn`, and the next step proceeds.

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn};

use crate::artifacts::{ArtifactStore, DownloadSummary};
use crate::backend::{BackendPair, ProofPayload, VerifierBackend};
use crate::core::{BackendId, Catalog, CircuitId, CircuitSpec, Clock, RunState, SoftDecodeWarning, TimingRecord};
use crate::{BenchError, BenchResult};

/// Notification emitted while a run progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    StateChanged { from: RunState, to: RunState },
    StepFinished(StepOutcome),
    Warning(SoftDecodeWarning),
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    Succeeded {
        elapsed_ms: u64,
        clock: Clock,
        /// Verification verdict, for verify steps.
        #[serde(skip_serializing_if = "Option::is_none")]
        valid: Option<bool>,
    },
    Failed {
        kind: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub circuit: CircuitId,
    pub backend: BackendId,
    pub result: StepResult,
}

impl StepOutcome {
    fn succeeded(circuit: CircuitId, backend: BackendId, elapsed_ms: u64, clock: Clock) -> Self {
        StepOutcome {
            circuit,
            backend,
            result: StepResult::Succeeded {
                elapsed_ms,
                clock,
                valid: None,
            },
        }
    }

    fn failed(circuit: CircuitId, backend: BackendId, err: &BenchError) -> Self {
        warn!(%circuit, %backend, kind = err.kind(), error = %err, "step failed");
        StepOutcome {
            circuit,
            backend,
            result: StepResult::Failed {
                kind: err.kind().to_string(),
                message: err.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, StepResult::Succeeded { .. })
    }

    /// Measured duration, zero for failed steps.
    pub fn elapsed_ms(&self) -> u64 {
        match self.result {
            StepResult::Succeeded { elapsed_ms, .. } => elapsed_ms,
            StepResult::Failed { .. } => 0,
        }
    }

    pub fn timing(&self) -> TimingRecord {
        TimingRecord::new(self.circuit, self.backend, self.elapsed_ms())
    }
}

/// Every step outcome of a run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<StepOutcome>,
    pub warnings: Vec<SoftDecodeWarning>,
}

impl RunReport {
    pub fn timings(&self) -> Vec<TimingRecord> {
        self.outcomes.iter().map(StepOutcome::timing).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn outcome(&self, circuit: CircuitId, backend: BackendId) -> Option<&StepOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.circuit == circuit && o.backend == backend)
    }
}

pub struct Orchestrator {
    catalog: Catalog,
    pairs: Vec<BackendPair>,
    verifier: Option<Box<dyn VerifierBackend>>,
    state: RunState,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("circuits", &self.catalog.circuits.len())
            .field("pairs", &self.pairs)
            .field("verifier", &self.verifier.is_some())
            .field("state", &self.state)
            .finish()
    }
}

fn emit(events: Option<&UnboundedSender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening any more.
        let _ = tx.send(event);
    }
}

impl Orchestrator {
    pub fn new(catalog: Catalog, pairs: Vec<BackendPair>) -> Self {
        Orchestrator {
            catalog,
            pairs,
            verifier: None,
            state: RunState::Idle,
        }
    }

    pub fn with_verifier(mut self, verifier: Box<dyn VerifierBackend>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn transition(&mut self, to: RunState, events: Option<&UnboundedSender<RunEvent>>) {
        let from = self.state;
        if from == to {
            return;
        }
        info!(%from, %to, "run state changed");
        self.state = to;
        emit(events, RunEvent::StateChanged { from, to });
    }

    fn ensure_can_request(&self) -> BenchResult<()> {
        match self.state {
            RunState::Idle | RunState::ArtifactsPending | RunState::ArtifactsReady => Ok(()),
            other => Err(BenchError::InvalidState(format!(
                "cannot request artifacts while {other}"
            ))),
        }
    }

    /// Fetch every artifact the catalog needs and move towards
    /// `ArtifactsReady`. Stays `ArtifactsPending` if any artifact is still
    /// missing afterwards.
    pub async fn request_artifacts(&mut self, store: &ArtifactStore) -> BenchResult<DownloadSummary> {
        self.ensure_can_request()?;
        if !store.all_present() {
            self.transition(RunState::ArtifactsPending, None);
        }
        let summary = store.request_all().await;
        self.sync_artifacts(store)?;
        Ok(summary)
    }

    /// Re-check the store without fetching; promotes to `ArtifactsReady`
    /// once every artifact is on disk.
    pub fn sync_artifacts(&mut self, store: &ArtifactStore) -> BenchResult<RunState> {
        self.ensure_can_request()?;
        if store.all_present() {
            self.transition(RunState::ArtifactsReady, None);
        } else {
            let missing = store.missing();
            warn!(missing = missing.len(), "artifacts still missing: {}", missing.join(", "));
            self.transition(RunState::ArtifactsPending, None);
        }
        Ok(self.state)
    }

    /// Run every circuit through every backend, sequentially.
    pub fn run(&mut self) -> BenchResult<RunReport> {
        self.execute(None)
    }

    /// Like [`run`](Self::run), emitting [`RunEvent`]s as steps finish.
    pub fn execute(&mut self, events: Option<&UnboundedSender<RunEvent>>) -> BenchResult<RunReport> {
        match self.state {
            RunState::ArtifactsReady => {}
            RunState::Idle | RunState::ArtifactsPending => {
                return Err(BenchError::PrerequisiteMissing(
                    "circuit artifacts are not all present".into(),
                ));
            }
            other => {
                return Err(BenchError::InvalidState(format!("cannot start a run while {other}")));
            }
        }

        self.transition(RunState::Running, events);
        let mut report = RunReport::default();

        for circuit in &self.catalog.circuits {
            let _span = info_span!("circuit", circuit = %circuit.id).entered();
            let mut last_proof: Option<ProofPayload> = None;

            for pair in &self.pairs {
                let witness = {
                    let _step = info_span!("step", backend = %pair.witness.id()).entered();
                    match pair.witness.compute_witness(circuit) {
                        Ok(output) => {
                            let outcome = StepOutcome::succeeded(circuit.id, pair.witness.id(), output.elapsed_ms, output.clock);
                            push(&mut report, outcome, events);
                            Some(output.payload)
                        }
                        Err(err) => {
                            push(&mut report, StepOutcome::failed(circuit.id, pair.witness.id(), &err), events);
                            None
                        }
                    }
                };

                let _step = info_span!("step", backend = %pair.prover.id()).entered();
                match pair.prover.prove(circuit, witness.as_ref()) {
                    Ok(output) => {
                        let outcome = StepOutcome::succeeded(circuit.id, pair.prover.id(), output.elapsed_ms, output.clock);
                        push(&mut report, outcome, events);
                        if let Some(warning) = output.warning {
                            report.warnings.push(warning.clone());
                            emit(events, RunEvent::Warning(warning));
                        }
                        if output.payload.is_some() {
                            last_proof = output.payload;
                        }
                    }
                    Err(err) => {
                        push(&mut report, StepOutcome::failed(circuit.id, pair.prover.id(), &err), events);
                    }
                }
            }

            if let Some(verifier) = &self.verifier {
                if circuit.verification_key.is_some() {
                    let outcome = verify_step(verifier.as_ref(), circuit, last_proof.as_ref());
                    push(&mut report, outcome, events);
                }
            }
        }

        self.transition(RunState::Completed, events);
        let failed = report.failures().count();
        info!(steps = report.outcomes.len(), failed, "run completed");
        Ok(report)
    }

    /// Run on a blocking worker. Events arrive on the returned receiver; the
    /// handle yields the orchestrator back together with the report.
    pub fn spawn_run(mut self) -> (UnboundedReceiver<RunEvent>, JoinHandle<(Orchestrator, BenchResult<RunReport>)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::task::spawn_blocking(move || {
            let result = self.execute(Some(&tx));
            (self, result)
        });
        (rx, handle)
    }

    /// Return from `Completed` to `Idle`. Artifacts on disk are untouched,
    /// so the next request resolves without fetching.
    pub fn reset(&mut self) -> BenchResult<()> {
        match self.state {
            RunState::Completed => {
                self.transition(RunState::Idle, None);
                Ok(())
            }
            RunState::Idle => Ok(()),
            other => Err(BenchError::InvalidState(format!("cannot reset while {other}"))),
        }
    }
}

fn push(report: &mut RunReport, outcome: StepOutcome, events: Option<&UnboundedSender<RunEvent>>) {
    emit(events, RunEvent::StepFinished(outcome.clone()));
    report.outcomes.push(outcome);
}

fn verify_step(verifier: &dyn VerifierBackend, circuit: &CircuitSpec, proof: Option<&ProofPayload>) -> StepOutcome {
    let _step = info_span!("step", backend = %verifier.id()).entered();
    let result = match proof {
        Some(proof) => verifier.verify(circuit, proof),
        None => Err(BenchError::PrerequisiteMissing(format!(
            "no proof to verify for {}",
            circuit.id
        ))),
    };
    match result {
        Ok(output) => {
            if !output.valid {
                warn!(circuit = %circuit.id, "proof rejected by verifier");
            }
            StepOutcome {
                circuit: circuit.id,
                backend: verifier.id(),
                result: StepResult::Succeeded {
                    elapsed_ms: output.elapsed_ms,
                    clock: Clock::WallClock,
                    valid: Some(output.valid),
                },
            }
        }
        Err(err) => StepOutcome::failed(circuit.id, verifier.id(), &err),
    }
}
