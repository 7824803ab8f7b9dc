pub mod artifacts;
pub mod artifacts_cmd;
pub mod backend;
pub mod config;
pub mod core;
pub mod engine;
pub mod explore_cmd;
pub mod ffi;
pub mod report;
pub mod run_cmd;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("artifact missing: {0}")]
    ArtifactMissing(String),
    #[error("witness computation failed: {0}")]
    WitnessComputationFailed(String),
    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),
    #[error("proof generation failed: {0}")]
    ProofGenerationFailed(String),
    #[error("verification failed: {0}")]
    VerificationFailed(String),
    #[error("{what} buffer over capacity: reported {reported} bytes, capacity {capacity}")]
    BufferOverCapacity {
        what: &'static str,
        reported: usize,
        capacity: usize,
    },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("fetch of {url} failed: {message}")]
    Fetch { url: String, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl BenchError {
    /// Short, stable name of the error kind, used in logs and step outcomes.
    pub fn kind(&self) -> &'static str {
        match self {
            BenchError::ArtifactMissing(_) => "ArtifactMissing",
            BenchError::WitnessComputationFailed(_) => "WitnessComputationFailed",
            BenchError::PrerequisiteMissing(_) => "PrerequisiteMissing",
            BenchError::ProofGenerationFailed(_) => "ProofGenerationFailed",
            BenchError::VerificationFailed(_) => "VerificationFailed",
            BenchError::BufferOverCapacity { .. } => "BufferOverCapacity",
            BenchError::InvalidState(_) => "InvalidState",
            BenchError::Fetch { .. } => "Fetch",
            BenchError::Io(_) => "Io",
            BenchError::Message(_) => "Message",
            BenchError::Anyhow(_) => "Anyhow",
        }
    }
}

pub type BenchResult<T> = Result<T, BenchError>;

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}

/// Whole milliseconds of a measured duration.
pub fn whole_millis(elapsed: std::time::Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
