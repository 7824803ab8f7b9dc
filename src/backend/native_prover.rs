//! Native fast Groth16 prover (`rapidsnark`).

use std::ffi::c_ulong;

use tracing::debug;

use super::traits::{ArtifactLocator, ProofPayload, ProveOutput, ProverBackend, WitnessPayload};
use crate::core::{BackendId, CircuitSpec, Clock};
use crate::ffi::native::classify;
use crate::ffi::{CapacityPolicy, NativeLibrary, c_len, negotiate};
use crate::{BenchError, BenchResult, whole_millis};

pub struct NativeFastProver {
    locator: ArtifactLocator,
    library: NativeLibrary,
    policy: CapacityPolicy,
}

impl NativeFastProver {
    pub fn new(locator: ArtifactLocator, library: NativeLibrary, policy: CapacityPolicy) -> Self {
        NativeFastProver {
            locator,
            library,
            policy,
        }
    }
}

impl ProverBackend for NativeFastProver {
    fn id(&self) -> BackendId {
        BackendId::Rapidsnark
    }

    fn prove(&self, circuit: &CircuitSpec, witness: Option<&WitnessPayload>) -> BenchResult<ProveOutput> {
        let witness = witness.ok_or_else(|| {
            BenchError::PrerequisiteMissing(format!("no witness for {}", circuit.id))
        })?;
        let proving_key = self.locator.read(&circuit.proving_key)?;
        let prover = self.library.prover()?;

        // The witness length passed is the reported length, never the capacity.
        let wtns = witness.bytes();
        let zkey_len = c_len("proving key", proving_key.len())?;
        let wtns_len = c_len("witness", wtns.len())?;
        let negotiated = negotiate(
            ["proof", "public"],
            self.policy,
            BenchError::ProofGenerationFailed,
            |bufs, errors| {
                let [proof, public] = bufs;
                let mut proof_len: c_ulong = proof.capacity_c();
                let mut public_len: c_ulong = public.capacity_c();
                let status = unsafe {
                    prover(
                        proving_key.as_ptr().cast(),
                        zkey_len,
                        wtns.as_ptr().cast(),
                        wtns_len,
                        proof.as_mut_ptr(),
                        &mut proof_len,
                        public.as_mut_ptr(),
                        &mut public_len,
                        errors.as_mut_ptr(),
                        errors.capacity_c(),
                    )
                };
                proof.record_claim(proof_len);
                public.record_claim(public_len);
                classify(status)
            },
        )?;

        debug!(circuit = %circuit.id, attempts = negotiated.attempts, "proof generated");
        let elapsed_ms = whole_millis(negotiated.elapsed);
        let [proof, public] = negotiated.buffers;
        let output = ProveOutput {
            payload: Some(ProofPayload { proof, public }),
            elapsed_ms,
            clock: Clock::WallClock,
            proof: None,
            warning: None,
        };
        Ok(output.with_decoded(circuit.id, self.id()))
    }
}
