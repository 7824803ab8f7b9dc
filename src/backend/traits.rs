//! Backend traits and output types shared by the witness, prover and
//! verifier implementations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{BackendId, CircuitId, CircuitSpec, Clock, SoftDecodeWarning};
use crate::ffi::{NativeBuffer, until_nul};
use crate::{BenchError, BenchResult};

/// Resolves artifact names to files in the local artifacts directory.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    dir: PathBuf,
}

impl ArtifactLocator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ArtifactLocator { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, artifact: &str) -> PathBuf {
        self.dir.join(artifact)
    }

    /// Path of an artifact that must already exist.
    pub fn require(&self, artifact: &str) -> BenchResult<PathBuf> {
        let path = self.path_of(artifact);
        if !path.is_file() {
            return Err(BenchError::ArtifactMissing(path.display().to_string()));
        }
        Ok(path)
    }

    /// Full contents of an artifact.
    pub fn read(&self, artifact: &str) -> BenchResult<Vec<u8>> {
        let path = self.require(artifact)?;
        std::fs::read(&path)
            .map_err(|e| BenchError::ArtifactMissing(format!("{}: {e}", path.display())))
    }
}

/// Witness bytes produced by one step, with the capacity they were written into.
///
/// The reported length never exceeds the declared capacity; payloads that
/// would violate this are rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessPayload {
    pub circuit: CircuitId,
    pub backend: BackendId,
    bytes: Vec<u8>,
    capacity: usize,
}

impl WitnessPayload {
    pub fn from_buffer(circuit: CircuitId, backend: BackendId, buffer: NativeBuffer) -> BenchResult<Self> {
        buffer.validate()?;
        let capacity = buffer.capacity();
        Ok(WitnessPayload {
            circuit,
            backend,
            bytes: buffer.into_filled(),
            capacity,
        })
    }

    pub fn from_bytes(circuit: CircuitId, backend: BackendId, bytes: Vec<u8>) -> Self {
        let capacity = bytes.len();
        WitnessPayload {
            circuit,
            backend,
            bytes,
            capacity,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn reported_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Proof and public-signal buffers returned by a prover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofPayload {
    pub proof: NativeBuffer,
    pub public: NativeBuffer,
}

impl ProofPayload {
    /// Wrap JSON texts as NUL-terminated buffers.
    pub fn from_json(proof: &str, public: &str) -> Self {
        ProofPayload {
            proof: NativeBuffer::terminated("proof", proof.as_bytes()),
            public: NativeBuffer::terminated("public", public.as_bytes()),
        }
    }

    /// Logical proof content: the bytes before the first NUL.
    pub fn proof_text(&self) -> &[u8] {
        self.proof.until_nul().unwrap_or(self.proof.filled())
    }

    pub fn public_text(&self) -> &[u8] {
        self.public.until_nul().unwrap_or(self.public.filled())
    }
}

/// Decoded Groth16 proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub pi_a: Vec<String>,
    pub pi_b: Vec<Vec<String>>,
    pub pi_c: Vec<String>,
    pub protocol: String,
}

/// Decode the proof JSON held before the first NUL of `region`.
pub fn decode_proof(region: &[u8]) -> Result<Proof, String> {
    let text = until_nul(region).ok_or_else(|| "proof buffer has no terminator".to_string())?;
    serde_json::from_slice(text).map_err(|e| format!("invalid proof JSON: {e}"))
}

/// Output from a witness computation.
#[derive(Debug, Clone)]
pub struct WitnessOutput {
    pub payload: WitnessPayload,
    pub elapsed_ms: u64,
    pub clock: Clock,
}

/// Output from a prove operation.
#[derive(Debug, Clone)]
pub struct ProveOutput {
    /// Proof buffers, when the prover hands them back to the caller.
    pub payload: Option<ProofPayload>,
    pub elapsed_ms: u64,
    pub clock: Clock,
    pub proof: Option<Proof>,
    /// Set when the proof came back but could not be decoded.
    pub warning: Option<SoftDecodeWarning>,
}

impl ProveOutput {
    /// Attach the decoded proof, or a soft warning if decoding fails.
    pub fn with_decoded(mut self, circuit: CircuitId, backend: BackendId) -> Self {
        if let Some(payload) = &self.payload {
            match decode_proof(payload.proof.region()) {
                Ok(proof) => self.proof = Some(proof),
                Err(message) => {
                    let warning = SoftDecodeWarning {
                        circuit,
                        backend,
                        message,
                    };
                    tracing::warn!(%warning, "proof decode failed");
                    self.warning = Some(warning);
                }
            }
        }
        self
    }
}

/// Output from a verify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutput {
    pub valid: bool,
    pub elapsed_ms: u64,
}

/// Computes a circuit's witness from its artifacts and inputs.
pub trait WitnessBackend: Send + Sync {
    fn id(&self) -> BackendId;

    fn compute_witness(&self, circuit: &CircuitSpec) -> BenchResult<WitnessOutput>;
}

/// Produces a Groth16 proof from a witness.
pub trait ProverBackend: Send + Sync {
    fn id(&self) -> BackendId;

    /// `witness` is the payload of the paired witness step, if it succeeded.
    fn prove(&self, circuit: &CircuitSpec, witness: Option<&WitnessPayload>) -> BenchResult<ProveOutput>;
}

/// Checks a proof against the circuit's verification key.
pub trait VerifierBackend: Send + Sync {
    fn id(&self) -> BackendId {
        BackendId::Verifier
    }

    fn verify(&self, circuit: &CircuitSpec, proof: &ProofPayload) -> BenchResult<VerifyOutput>;
}

/// A witness backend and the prover that consumes its output.
pub struct BackendPair {
    pub witness: Box<dyn WitnessBackend>,
    pub prover: Box<dyn ProverBackend>,
}

impl BackendPair {
    pub fn new(witness: Box<dyn WitnessBackend>, prover: Box<dyn ProverBackend>) -> Self {
        BackendPair { witness, prover }
    }
}

impl std::fmt::Debug for BackendPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendPair")
            .field("witness", &self.witness.id())
            .field("prover", &self.prover.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PROOF: &str = r#"{"pi_a":["1","2","1"],"pi_b":[["1","2"],["3","4"],["1","0"]],"pi_c":["5","6","1"],"protocol":"groth16"}"#;

    #[test]
    fn test_decode_proof_stops_at_nul() {
        let mut region = PROOF.as_bytes().to_vec();
        region.push(0);
        region.extend_from_slice(b"garbage after terminator");
        let proof = decode_proof(&region).unwrap();
        assert_eq!(proof.protocol, "groth16");
        assert_eq!(proof.pi_b.len(), 3);
    }

    #[test]
    fn test_decode_proof_without_terminator() {
        let err = decode_proof(PROOF.as_bytes()).unwrap_err();
        assert!(err.contains("no terminator"));
    }

    #[test]
    fn test_prove_output_soft_warning() {
        let output = ProveOutput {
            payload: Some(ProofPayload::from_json("not json", "[]")),
            elapsed_ms: 7,
            clock: Clock::WallClock,
            proof: None,
            warning: None,
        }
        .with_decoded(CircuitId::Rsa, BackendId::Rapidsnark);
        assert!(output.proof.is_none());
        assert_eq!(output.elapsed_ms, 7);
        let warning = output.warning.unwrap();
        assert_eq!(warning.backend, BackendId::Rapidsnark);
    }

    #[test]
    fn test_proof_payload_text() {
        let payload = ProofPayload::from_json(PROOF, r#"["1"]"#);
        assert_eq!(payload.proof_text(), PROOF.as_bytes());
        assert_eq!(payload.public_text(), br#"["1"]"#);
    }

    #[test]
    fn test_witness_payload_rejects_over_claim() {
        let mut buf = NativeBuffer::with_capacity("witness", 4);
        buf.record_claim(5);
        let err = WitnessPayload::from_buffer(CircuitId::Sha256, BackendId::WitnessCalc, buf).unwrap_err();
        assert_eq!(err.kind(), "BufferOverCapacity");
    }

    #[test]
    fn test_locator_require() {
        let dir = tempdir().unwrap();
        let locator = ArtifactLocator::new(dir.path());
        assert_eq!(locator.require("a.zkey").unwrap_err().kind(), "ArtifactMissing");
        std::fs::write(dir.path().join("a.zkey"), b"pk").unwrap();
        assert_eq!(locator.read("a.zkey").unwrap(), b"pk");
    }
}
