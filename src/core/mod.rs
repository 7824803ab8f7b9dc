//! Core types for circom-bench.
//!
//! The circuit catalog, timing records and the run state machine's states.

pub mod circuit;
pub mod env;
pub mod schema;

// Re-export key types for convenience
pub use circuit::{Catalog, CircuitId, CircuitInputs, CircuitSpec, DEFAULT_BASE_URL, InputRule};
pub use env::EnvironmentInfo;
pub use schema::{BackendId, Clock, RunState, SoftDecodeWarning, Stage, TimingRecord};
