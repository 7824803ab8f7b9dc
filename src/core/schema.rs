//! Timing records, backend identities and the run state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::circuit::CircuitId;

/// Which benchmark stage a backend implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Witness,
    Prove,
    Verify,
}

/// Concrete implementation being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendId {
    /// In-process graph witness engine.
    #[serde(rename = "witness-rs")]
    WitnessRs,
    /// Native graph evaluator.
    #[serde(rename = "witnesscalc")]
    WitnessCalc,
    /// In-process Groth16 prover sharing the witness engine context.
    #[serde(rename = "ark-works")]
    ArkWorks,
    /// Native fast Groth16 prover.
    #[serde(rename = "rapidsnark")]
    Rapidsnark,
    #[serde(rename = "verifier")]
    Verifier,
}

impl BackendId {
    /// Columns of the comparison table, in summary order.
    pub const SUMMARY_ORDER: [BackendId; 4] = [
        BackendId::WitnessRs,
        BackendId::WitnessCalc,
        BackendId::ArkWorks,
        BackendId::Rapidsnark,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BackendId::WitnessRs => "witness-rs",
            BackendId::WitnessCalc => "witnesscalc",
            BackendId::ArkWorks => "ark-works",
            BackendId::Rapidsnark => "rapidsnark",
            BackendId::Verifier => "verifier",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            BackendId::WitnessRs | BackendId::WitnessCalc => Stage::Witness,
            BackendId::ArkWorks | BackendId::Rapidsnark => Stage::Prove,
            BackendId::Verifier => Stage::Verify,
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a duration comes from. Engine time is self-reported by the native
/// library; wall-clock time is measured by the caller around the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clock {
    Engine,
    WallClock,
}

/// One measured duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub circuit: CircuitId,
    pub backend: BackendId,
    /// Whole milliseconds; zero means "not run".
    pub duration_ms: u64,
}

impl TimingRecord {
    pub fn new(circuit: CircuitId, backend: BackendId, duration_ms: u64) -> Self {
        TimingRecord {
            circuit,
            backend,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    ArtifactsPending,
    ArtifactsReady,
    Running,
    Completed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::ArtifactsPending => "artifacts-pending",
            RunState::ArtifactsReady => "artifacts-ready",
            RunState::Running => "running",
            RunState::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// A proof that came back from a successful native call but could not be
/// decoded. Recorded and logged, never propagated as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDecodeWarning {
    pub circuit: CircuitId,
    pub backend: BackendId,
    pub message: String,
}

impl fmt::Display for SoftDecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}: proof decode skipped: {}",
            self.circuit, self.backend, self.message
        )
    }
}
