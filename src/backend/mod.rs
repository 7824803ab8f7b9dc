//! Witness, prover and verifier backends.
//!
//! Every implementation sits behind one of three traits so the orchestrator
//! can run them uniformly. Native-backed variants reach their libraries
//! through a [`NativeLibrary`] table; mocks return configured results.

pub mod graph_eval;
pub mod in_process;
pub mod mock;
pub mod native_prover;
pub mod traits;
pub mod verifier;

use std::path::PathBuf;

use crate::ffi::{CapacityPolicy, NativeLibrary};

// Re-export key types
pub use graph_eval::GraphEvaluatorWitness;
pub use in_process::{AlgebraicProver, InProcessWitness, SharedContext, in_process_pair};
pub use mock::{MockConfig, MockProver, MockVerifier, MockWitness, mock_pairs};
pub use native_prover::NativeFastProver;
pub use traits::{
    ArtifactLocator, BackendPair, Proof, ProofPayload, ProveOutput, ProverBackend, VerifierBackend,
    VerifyOutput, WitnessBackend, WitnessOutput, WitnessPayload, decode_proof,
};
pub use verifier::NativeVerifier;

/// Buffer sizing for the native backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeOptions {
    pub witness: CapacityPolicy,
    pub proof: CapacityPolicy,
}

impl Default for NativeOptions {
    fn default() -> Self {
        NativeOptions {
            witness: CapacityPolicy::witness(),
            proof: CapacityPolicy::proof(),
        }
    }
}

/// The two benchmark pairs over native libraries, in run order:
/// `witness-rs → ark-works`, then `witnesscalc → rapidsnark`.
pub fn native_pairs(dir: impl Into<PathBuf>, library: &NativeLibrary, options: NativeOptions) -> Vec<BackendPair> {
    let locator = ArtifactLocator::new(dir);
    vec![
        in_process_pair(locator.clone(), library.clone(), options.witness),
        graph_pair(locator, library, options),
    ]
}

/// The `witnesscalc → rapidsnark` pair alone.
pub fn graph_pair(locator: ArtifactLocator, library: &NativeLibrary, options: NativeOptions) -> BackendPair {
    BackendPair::new(
        Box::new(GraphEvaluatorWitness::new(
            locator.clone(),
            library.clone(),
            options.witness,
        )),
        Box::new(NativeFastProver::new(locator, library.clone(), options.proof)),
    )
}
