//! Engine module: sequences backends over circuits and tracks run state.
//!
//! # Architecture
//!
//! - **Backends** (`crate::backend`) compute witnesses, proofs and verdicts
//!   for one circuit at a time. They know nothing about ordering.
//! - **Orchestrator** owns the run state machine, gates runs on artifact
//!   presence, runs every step in a fixed order and reports each outcome.
//! - **Exploration** reuses the orchestrator for the single-circuit
//!   witness, prove and verify path.
//!
//! Consumers observe a run through [`RunEvent`]s and keep their own
//! result table; nothing here mutates presentation state.

pub mod exploration;
pub mod orchestrator;

// Re-export key types for convenience
pub use exploration::{ExplorationReport, exploration_orchestrator};
pub use orchestrator::{Orchestrator, RunEvent, RunReport, StepOutcome, StepResult};
