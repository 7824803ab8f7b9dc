//! Native Groth16 verifier.

use std::ffi::CString;
use std::time::Instant;

use super::traits::{ArtifactLocator, ProofPayload, VerifierBackend, VerifyOutput};
use crate::core::CircuitSpec;
use crate::ffi::native::{VERIFY_INVALID, VERIFY_VALID};
use crate::ffi::{ErrorBuffer, NativeLibrary, until_nul};
use crate::{BenchError, BenchResult, whole_millis};

pub struct NativeVerifier {
    locator: ArtifactLocator,
    library: NativeLibrary,
}

impl NativeVerifier {
    pub fn new(locator: ArtifactLocator, library: NativeLibrary) -> Self {
        NativeVerifier { locator, library }
    }
}

fn terminated(what: &str, bytes: &[u8]) -> BenchResult<CString> {
    let logical = until_nul(bytes).unwrap_or(bytes);
    CString::new(logical).map_err(|e| BenchError::VerificationFailed(format!("{what}: {e}")))
}

impl VerifierBackend for NativeVerifier {
    fn verify(&self, circuit: &CircuitSpec, proof: &ProofPayload) -> BenchResult<VerifyOutput> {
        let vk_name = circuit.verification_key.as_deref().ok_or_else(|| {
            BenchError::PrerequisiteMissing(format!("{} has no verification key", circuit.id))
        })?;
        let vkey = terminated("verification key", &self.locator.read(vk_name)?)?;
        let proof_text = terminated("proof", proof.proof_text())?;
        let public_text = terminated("public signals", proof.public_text())?;
        let verify = self.library.verifier()?;

        let mut errors = ErrorBuffer::new();
        let start = Instant::now();
        let status = unsafe {
            verify(
                proof_text.as_ptr(),
                public_text.as_ptr(),
                vkey.as_ptr(),
                errors.as_mut_ptr(),
                errors.capacity_c(),
            )
        };
        let elapsed_ms = whole_millis(start.elapsed());

        match status {
            VERIFY_VALID => Ok(VerifyOutput {
                valid: true,
                elapsed_ms,
            }),
            VERIFY_INVALID => Ok(VerifyOutput {
                valid: false,
                elapsed_ms,
            }),
            other => Err(BenchError::VerificationFailed(format!(
                "status {other}: {}",
                errors.message()
            ))),
        }
    }
}
