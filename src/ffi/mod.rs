//! Native boundary: caller-owned buffers and the entry-point table.

pub mod buffer;
pub mod native;

pub use buffer::{
    CallStatus, CapacityPolicy, ErrorBuffer, NativeBuffer, Negotiated, ERROR_CAPACITY,
    PROOF_CAPACITY, WITNESS_CAPACITY, c_len, negotiate, until_nul,
};
pub use native::{ContextBridge, NativeLibrary};
