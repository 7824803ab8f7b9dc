//! Mock backends for testing.

use crate::core::{BackendId, CircuitId, CircuitSpec, Clock};
use crate::{BenchError, BenchResult};

use super::traits::{
    BackendPair, ProofPayload, ProveOutput, ProverBackend, VerifierBackend, VerifyOutput,
    WitnessBackend, WitnessOutput, WitnessPayload,
};

/// A well-formed proof document.
pub const MOCK_PROOF_JSON: &str = r#"{"pi_a":["1","2","1"],"pi_b":[["1","0"],["2","0"],["1","0"]],"pi_c":["3","4","1"],"protocol":"groth16"}"#;

/// Configuration for mock backend responses.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Witness time to report
    pub witness_ms: u64,
    /// Prove time to report
    pub prove_ms: u64,
    /// Verify time to report
    pub verify_ms: u64,
    /// Proof text returned by provers that hand back buffers
    pub proof_json: String,
    /// Verification verdict
    pub valid: bool,
    pub witness_fails: bool,
    pub prove_fails: bool,
    pub verify_fails: bool,
    /// Restrict configured failures to these circuits (all when empty)
    pub fail_circuits: Vec<CircuitId>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConfig {
    pub fn new() -> Self {
        MockConfig {
            witness_ms: 10,
            prove_ms: 100,
            verify_ms: 5,
            proof_json: MOCK_PROOF_JSON.to_string(),
            valid: true,
            witness_fails: false,
            prove_fails: false,
            verify_fails: false,
            fail_circuits: Vec::new(),
        }
    }

    pub fn with_witness_ms(mut self, ms: u64) -> Self {
        self.witness_ms = ms;
        self
    }

    pub fn with_prove_ms(mut self, ms: u64) -> Self {
        self.prove_ms = ms;
        self
    }

    pub fn with_proof_json(mut self, json: impl Into<String>) -> Self {
        self.proof_json = json.into();
        self
    }

    /// Make witness computation fail.
    pub fn witness_fails(mut self) -> Self {
        self.witness_fails = true;
        self
    }

    /// Make prove fail.
    pub fn prove_fails(mut self) -> Self {
        self.prove_fails = true;
        self
    }

    /// Make verify fail.
    pub fn verify_fails(mut self) -> Self {
        self.verify_fails = true;
        self
    }

    /// Report proofs as invalid.
    pub fn invalid_proof(mut self) -> Self {
        self.valid = false;
        self
    }

    /// Only fail for `circuit` (may be called repeatedly).
    pub fn fails_for(mut self, circuit: CircuitId) -> Self {
        self.fail_circuits.push(circuit);
        self
    }

    fn applies_to(&self, circuit: CircuitId) -> bool {
        self.fail_circuits.is_empty() || self.fail_circuits.contains(&circuit)
    }
}

/// Witness backend returning a fixed payload and timing.
pub struct MockWitness {
    id: BackendId,
    config: MockConfig,
}

impl MockWitness {
    pub fn new(id: BackendId, config: MockConfig) -> Self {
        MockWitness { id, config }
    }
}

impl WitnessBackend for MockWitness {
    fn id(&self) -> BackendId {
        self.id
    }

    fn compute_witness(&self, circuit: &CircuitSpec) -> BenchResult<WitnessOutput> {
        if self.config.witness_fails && self.config.applies_to(circuit.id) {
            return Err(BenchError::WitnessComputationFailed(format!(
                "mock {} failed",
                self.id
            )));
        }
        Ok(WitnessOutput {
            payload: WitnessPayload::from_bytes(circuit.id, self.id, b"wtns".to_vec()),
            elapsed_ms: self.config.witness_ms,
            clock: Clock::WallClock,
        })
    }
}

/// Prover backend returning a fixed proof and timing.
pub struct MockProver {
    id: BackendId,
    config: MockConfig,
}

impl MockProver {
    pub fn new(id: BackendId, config: MockConfig) -> Self {
        MockProver { id, config }
    }
}

impl ProverBackend for MockProver {
    fn id(&self) -> BackendId {
        self.id
    }

    fn prove(&self, circuit: &CircuitSpec, witness: Option<&WitnessPayload>) -> BenchResult<ProveOutput> {
        if witness.is_none() {
            return Err(BenchError::PrerequisiteMissing(format!(
                "no witness for {}",
                circuit.id
            )));
        }
        if self.config.prove_fails && self.config.applies_to(circuit.id) {
            return Err(BenchError::ProofGenerationFailed(format!("mock {} failed", self.id)));
        }
        let output = ProveOutput {
            payload: Some(ProofPayload::from_json(&self.config.proof_json, r#"["1"]"#)),
            elapsed_ms: self.config.prove_ms,
            clock: Clock::WallClock,
            proof: None,
            warning: None,
        };
        Ok(output.with_decoded(circuit.id, self.id))
    }
}

pub struct MockVerifier {
    config: MockConfig,
}

impl MockVerifier {
    pub fn new(config: MockConfig) -> Self {
        MockVerifier { config }
    }
}

impl VerifierBackend for MockVerifier {
    fn verify(&self, circuit: &CircuitSpec, _proof: &ProofPayload) -> BenchResult<VerifyOutput> {
        if self.config.verify_fails && self.config.applies_to(circuit.id) {
            return Err(BenchError::VerificationFailed("mock verify failed".into()));
        }
        Ok(VerifyOutput {
            valid: self.config.valid,
            elapsed_ms: self.config.verify_ms,
        })
    }
}

/// Both benchmark pairs backed by mocks sharing one configuration.
pub fn mock_pairs(config: &MockConfig) -> Vec<BackendPair> {
    vec![
        BackendPair::new(
            Box::new(MockWitness::new(BackendId::WitnessRs, config.clone())),
            Box::new(MockProver::new(BackendId::ArkWorks, config.clone())),
        ),
        BackendPair::new(
            Box::new(MockWitness::new(BackendId::WitnessCalc, config.clone())),
            Box::new(MockProver::new(BackendId::Rapidsnark, config.clone())),
        ),
    ]
}
