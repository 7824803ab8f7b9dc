//! Integration tests for the benchmark orchestrator.
//!
//! These tests drive the full state machine with mock backends and a
//! scripted artifact fetcher, so they need neither network access nor the
//! native libraries.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use circom_bench::artifacts::{ArtifactStore, Fetcher};
use circom_bench::backend::{MockConfig, MockVerifier, mock_pairs};
use circom_bench::core::{BackendId, Catalog, CircuitId, Clock, RunState, Stage};
use circom_bench::engine::{ExplorationReport, Orchestrator, RunEvent, StepResult};
use circom_bench::report::ResultTable;
use circom_bench::{BenchError, BenchResult};
use tempfile::{TempDir, tempdir};

const BASE: &str = "https://keys.test/";

struct CountingFetcher {
    calls: AtomicUsize,
    fail_suffix: Option<&'static str>,
}

impl CountingFetcher {
    fn new() -> Arc<Self> {
        Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail_suffix: None,
        })
    }

    fn failing_on(suffix: &'static str) -> Arc<Self> {
        Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail_suffix: Some(suffix),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> BenchResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_suffix {
            Some(suffix) if url.ends_with(suffix) => Err(BenchError::Fetch {
                url: url.to_string(),
                message: "connection reset".into(),
            }),
            _ => Ok(b"artifact".to_vec()),
        }
    }
}

fn mock_config() -> MockConfig {
    MockConfig::new().with_witness_ms(3).with_prove_ms(40)
}

fn create_test_orchestrator(config: &MockConfig) -> Orchestrator {
    Orchestrator::new(Catalog::reference(BASE), mock_pairs(config))
}

/// An orchestrator already at `ArtifactsReady`, with every artifact on disk.
async fn ready_orchestrator(config: &MockConfig) -> (TempDir, Orchestrator) {
    let dir = tempdir().unwrap();
    let mut orchestrator = create_test_orchestrator(config);
    let store = ArtifactStore::new(dir.path(), orchestrator.catalog(), CountingFetcher::new());
    orchestrator.request_artifacts(&store).await.unwrap();
    assert_eq!(orchestrator.state(), RunState::ArtifactsReady);
    (dir, orchestrator)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_full_lifecycle_with_events() {
    let dir = tempdir().unwrap();
    let fetcher = CountingFetcher::new();
    let mut orchestrator = create_test_orchestrator(&mock_config());
    let store = ArtifactStore::new(dir.path(), orchestrator.catalog(), fetcher.clone());

    assert_eq!(orchestrator.state(), RunState::Idle);

    let summary = orchestrator.request_artifacts(&store).await.unwrap();
    assert!(summary.is_complete());
    assert_eq!(summary.fetched, 12);
    assert_eq!(orchestrator.state(), RunState::ArtifactsReady);

    let (mut events, handle) = orchestrator.spawn_run();
    let mut table = ResultTable::default();
    let mut states = Vec::new();
    let mut steps = 0;
    while let Some(event) = events.recv().await {
        match &event {
            RunEvent::StateChanged { from, to } => states.push((*from, *to)),
            RunEvent::StepFinished(_) => steps += 1,
            RunEvent::Warning(w) => panic!("unexpected warning: {w}"),
        }
        table.apply(&event);
    }
    let (mut orchestrator, report) = handle.await.unwrap();
    let report = report.unwrap();

    assert_eq!(
        states,
        vec![
            (RunState::ArtifactsReady, RunState::Running),
            (RunState::Running, RunState::Completed),
        ]
    );
    assert_eq!(steps, 12);
    assert_eq!(report.outcomes.len(), 12);
    assert_eq!(report.failures().count(), 0);
    assert_eq!(orchestrator.state(), RunState::Completed);

    for circuit in CircuitId::BENCHMARK {
        for backend in BackendId::SUMMARY_ORDER {
            let expected = if backend.stage() == Stage::Witness { 3 } else { 40 };
            assert_eq!(table.get(circuit, backend), Some(expected), "{circuit}/{backend}");
        }
    }

    // Completed -> Idle, then back to ready without a single new fetch.
    orchestrator.reset().unwrap();
    assert_eq!(orchestrator.state(), RunState::Idle);
    table.reset();
    assert_eq!(table.get(CircuitId::Rsa, BackendId::Rapidsnark), Some(0));

    let again = orchestrator.request_artifacts(&store).await.unwrap();
    assert_eq!(again.already_present, 12);
    assert_eq!(fetcher.calls(), 12);
    assert_eq!(orchestrator.state(), RunState::ArtifactsReady);
}

#[tokio::test]
async fn test_steps_run_in_order() {
    let (_dir, mut orchestrator) = ready_orchestrator(&mock_config()).await;
    let report = orchestrator.run().unwrap();

    let order: Vec<(CircuitId, BackendId)> = report
        .outcomes
        .iter()
        .map(|o| (o.circuit, o.backend))
        .collect();
    let mut expected = Vec::new();
    for circuit in CircuitId::BENCHMARK {
        for backend in [
            BackendId::WitnessRs,
            BackendId::ArkWorks,
            BackendId::WitnessCalc,
            BackendId::Rapidsnark,
        ] {
            expected.push((circuit, backend));
        }
    }
    assert_eq!(order, expected);
}

#[tokio::test]
async fn test_failed_artifact_blocks_run() {
    let dir = tempdir().unwrap();
    let mut orchestrator = create_test_orchestrator(&mock_config());
    let store = ArtifactStore::new(
        dir.path(),
        orchestrator.catalog(),
        CountingFetcher::failing_on("sha256_512.dat"),
    );

    let summary = orchestrator.request_artifacts(&store).await.unwrap();
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(store.progress(), (12, 12));
    assert!(!store.is_ready());
    assert_eq!(orchestrator.state(), RunState::ArtifactsPending);

    let err = orchestrator.run().unwrap_err();
    assert!(matches!(err, BenchError::PrerequisiteMissing(_)), "got {err:?}");
    assert_eq!(orchestrator.state(), RunState::ArtifactsPending);

    // Dropping the file in by hand is enough for a sync to promote the state.
    std::fs::write(dir.path().join("sha256_512.dat"), b"artifact").unwrap();
    assert_eq!(orchestrator.sync_artifacts(&store).unwrap(), RunState::ArtifactsReady);
}

#[tokio::test]
async fn test_present_artifacts_skip_pending() {
    let dir = tempdir().unwrap();
    let catalog = Catalog::reference(BASE);
    for artifact in catalog.distinct_artifacts() {
        std::fs::write(dir.path().join(&artifact), b"artifact").unwrap();
    }
    let fetcher = CountingFetcher::new();
    let mut orchestrator = Orchestrator::new(catalog, mock_pairs(&mock_config()));
    let store = ArtifactStore::new(dir.path(), orchestrator.catalog(), fetcher.clone());

    assert_eq!(orchestrator.sync_artifacts(&store).unwrap(), RunState::ArtifactsReady);
    orchestrator.request_artifacts(&store).await.unwrap();
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(orchestrator.state(), RunState::ArtifactsReady);
}

#[tokio::test]
async fn test_run_before_artifacts() {
    let mut orchestrator = create_test_orchestrator(&mock_config());
    let err = orchestrator.run().unwrap_err();
    assert!(matches!(err, BenchError::PrerequisiteMissing(_)));
    assert_eq!(orchestrator.state(), RunState::Idle);
}

#[tokio::test]
async fn test_invalid_transitions() {
    let (_dir, mut orchestrator) = ready_orchestrator(&mock_config()).await;

    let err = orchestrator.reset().unwrap_err();
    assert!(matches!(err, BenchError::InvalidState(_)));

    orchestrator.run().unwrap();
    let err = orchestrator.run().unwrap_err();
    assert!(matches!(err, BenchError::InvalidState(_)));
    assert_eq!(orchestrator.state(), RunState::Completed);

    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path(), orchestrator.catalog(), CountingFetcher::new());
    let err = orchestrator.request_artifacts(&store).await.unwrap_err();
    assert!(matches!(err, BenchError::InvalidState(_)));
}

#[tokio::test]
async fn test_prover_failure_is_isolated() {
    let config = mock_config().prove_fails().fails_for(CircuitId::Rsa);
    let (_dir, mut orchestrator) = ready_orchestrator(&config).await;

    let report = orchestrator.run().unwrap();
    assert_eq!(orchestrator.state(), RunState::Completed);
    assert_eq!(report.outcomes.len(), 12);

    let failed: Vec<_> = report.failures().map(|o| (o.circuit, o.backend)).collect();
    assert_eq!(
        failed,
        vec![
            (CircuitId::Rsa, BackendId::ArkWorks),
            (CircuitId::Rsa, BackendId::Rapidsnark),
        ]
    );

    let mut table = ResultTable::default();
    table.apply_report(&report);
    assert_eq!(table.get(CircuitId::Rsa, BackendId::ArkWorks), Some(0));
    assert_eq!(table.get(CircuitId::Rsa, BackendId::WitnessRs), Some(3));
    assert_eq!(table.get(CircuitId::Sha256, BackendId::Rapidsnark), Some(40));
}

#[tokio::test]
async fn test_witness_failure_leaves_prover_without_input() {
    let config = mock_config().witness_fails().fails_for(CircuitId::Keccak256);
    let (_dir, mut orchestrator) = ready_orchestrator(&config).await;

    let report = orchestrator.run().unwrap();
    let witness = report
        .outcome(CircuitId::Keccak256, BackendId::WitnessCalc)
        .unwrap();
    assert!(matches!(&witness.result, StepResult::Failed { kind, .. } if kind == "WitnessComputationFailed"));

    let prover = report
        .outcome(CircuitId::Keccak256, BackendId::Rapidsnark)
        .unwrap();
    assert!(matches!(&prover.result, StepResult::Failed { kind, .. } if kind == "PrerequisiteMissing"));

    assert!(report.outcome(CircuitId::Sha256, BackendId::Rapidsnark).unwrap().is_success());
}

#[tokio::test]
async fn test_undecodable_proof_is_a_warning() {
    let config = mock_config().with_proof_json("not json");
    let (_dir, mut orchestrator) = ready_orchestrator(&config).await;

    let report = orchestrator.run().unwrap();
    assert_eq!(report.failures().count(), 0);
    // Every prover of every circuit recorded its time and one warning.
    assert_eq!(report.warnings.len(), 6);
    let outcome = report.outcome(CircuitId::Rsa, BackendId::Rapidsnark).unwrap();
    assert_eq!(
        outcome.result,
        StepResult::Succeeded {
            elapsed_ms: 40,
            clock: Clock::WallClock,
            valid: None
        }
    );
}

#[tokio::test]
async fn test_exploration_runs_verifier() {
    let dir = tempdir().unwrap();
    let config = MockConfig::new();
    let mut orchestrator = Orchestrator::new(Catalog::exploration(BASE), mock_pairs(&config))
        .with_verifier(Box::new(MockVerifier::new(config)));
    let store = ArtifactStore::new(dir.path(), orchestrator.catalog(), CountingFetcher::new());
    orchestrator.request_artifacts(&store).await.unwrap();

    let run = orchestrator.run().unwrap();
    let verify = run.outcome(CircuitId::Main, BackendId::Verifier).unwrap();
    assert_eq!(
        verify.result,
        StepResult::Succeeded {
            elapsed_ms: 5,
            clock: Clock::WallClock,
            valid: Some(true)
        }
    );

    let report = ExplorationReport::from_run(&run);
    assert_eq!(report.witness_ms, 10);
    assert_eq!(report.prove_ms, 100);
    assert_eq!(report.verify_ms, 5);
    assert!(report.is_verified());
}

#[tokio::test]
async fn test_reference_circuits_skip_verifier() {
    let dir = tempdir().unwrap();
    let config = mock_config();
    let mut orchestrator = create_test_orchestrator(&config).with_verifier(Box::new(MockVerifier::new(config)));
    let store = ArtifactStore::new(dir.path(), orchestrator.catalog(), CountingFetcher::new());
    orchestrator.request_artifacts(&store).await.unwrap();

    let report = orchestrator.run().unwrap();
    assert!(report.outcomes.iter().all(|o| o.backend != BackendId::Verifier));
}
