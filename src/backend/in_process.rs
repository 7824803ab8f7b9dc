//! In-process witness engine (`witness-rs`) and the Groth16 prover that
//! reuses its loaded context (`ark-works`).
//!
//! Both backends share one context slot. Computing a witness replaces the
//! slot with a fresh context initialized for that circuit; proving requires
//! the slot to hold a context for the same circuit.

use std::ffi::{CString, c_ulong, c_ulonglong, c_void};
use std::path::Path;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::traits::{
    ArtifactLocator, BackendPair, ProveOutput, ProverBackend, WitnessBackend, WitnessOutput,
    WitnessPayload,
};
use crate::core::{BackendId, CircuitId, CircuitSpec, Clock};
use crate::ffi::native::{STATUS_OK, classify};
use crate::ffi::{CapacityPolicy, ContextBridge, ErrorBuffer, NativeBuffer, NativeLibrary, c_len, negotiate};
use crate::{BenchError, BenchResult};

/// Owned handle to a native circuit context; freed on drop.
struct NativeContext {
    bridge: ContextBridge,
    handle: NonNull<c_void>,
}

// The handle is only ever used behind the slot's mutex.
unsafe impl Send for NativeContext {}

impl NativeContext {
    fn new(bridge: ContextBridge) -> BenchResult<Self> {
        let raw = unsafe { (bridge.new)() };
        let handle = NonNull::new(raw).ok_or_else(|| {
            BenchError::WitnessComputationFailed("circuit context allocation returned null".into())
        })?;
        Ok(NativeContext { bridge, handle })
    }

    fn initialize(&mut self, proving_key: &Path, graph: &Path) -> BenchResult<()> {
        let zkey = path_cstring(proving_key)?;
        let graph = path_cstring(graph)?;
        let mut errors = ErrorBuffer::new();
        let status = unsafe {
            (self.bridge.initialize)(
                self.handle.as_ptr(),
                zkey.as_ptr(),
                graph.as_ptr(),
                errors.as_mut_ptr(),
                errors.capacity_c(),
            )
        };
        if status != STATUS_OK {
            return Err(BenchError::WitnessComputationFailed(format!(
                "context initialization: status {status}: {}",
                errors.message()
            )));
        }
        Ok(())
    }

    /// Evaluate the loaded circuit; returns the witness and the engine's own
    /// elapsed milliseconds.
    fn generate_witness(&mut self, inputs_json: &[u8], policy: CapacityPolicy) -> BenchResult<(NativeBuffer, u64)> {
        let handle = self.handle.as_ptr();
        let generate = self.bridge.generate_witness;
        let mut engine_ms: c_ulonglong = 0;
        let inputs_len = c_len("input document", inputs_json.len())?;

        let negotiated = negotiate(
            ["witness"],
            policy,
            BenchError::WitnessComputationFailed,
            |bufs, errors| {
                let mut len: c_ulong = bufs[0].capacity_c();
                let status = unsafe {
                    generate(
                        handle,
                        inputs_json.as_ptr().cast(),
                        inputs_len,
                        bufs[0].as_mut_ptr(),
                        &mut len,
                        &mut engine_ms,
                        errors.as_mut_ptr(),
                        errors.capacity_c(),
                    )
                };
                bufs[0].record_claim(len);
                classify(status)
            },
        )?;

        let [witness] = negotiated.buffers;
        Ok((witness, engine_ms as u64))
    }

    fn generate_proof(&mut self) -> BenchResult<u64> {
        let mut engine_ms: c_ulonglong = 0;
        let mut errors = ErrorBuffer::new();
        let status = unsafe {
            (self.bridge.generate_proof)(
                self.handle.as_ptr(),
                &mut engine_ms,
                errors.as_mut_ptr(),
                errors.capacity_c(),
            )
        };
        if status != STATUS_OK {
            return Err(BenchError::ProofGenerationFailed(format!(
                "status {status}: {}",
                errors.message()
            )));
        }
        Ok(engine_ms as u64)
    }
}

impl Drop for NativeContext {
    fn drop(&mut self) {
        unsafe { (self.bridge.free)(self.handle.as_ptr()) }
    }
}

fn path_cstring(path: &Path) -> BenchResult<CString> {
    CString::new(path.to_string_lossy().into_owned())
        .map_err(|e| BenchError::Message(format!("{}: {e}", path.display())))
}

struct LoadedContext {
    circuit: CircuitId,
    context: NativeContext,
}

/// Slot holding the most recently initialized context.
#[derive(Clone, Default)]
pub struct SharedContext {
    slot: Arc<Mutex<Option<LoadedContext>>>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> BenchResult<MutexGuard<'_, Option<LoadedContext>>> {
        self.slot
            .lock()
            .map_err(|_| BenchError::Message("circuit context slot poisoned".into()))
    }

    /// Circuit the slot currently holds a context for.
    pub fn loaded_circuit(&self) -> Option<CircuitId> {
        self.lock().ok().and_then(|slot| slot.as_ref().map(|l| l.circuit))
    }

    /// Drop the held context, if any.
    pub fn clear(&self) {
        if let Ok(mut slot) = self.lock() {
            slot.take();
        }
    }
}

/// Graph witness engine running inside the process (`witness-rs`).
pub struct InProcessWitness {
    locator: ArtifactLocator,
    library: NativeLibrary,
    policy: CapacityPolicy,
    shared: SharedContext,
}

impl InProcessWitness {
    pub fn new(locator: ArtifactLocator, library: NativeLibrary, policy: CapacityPolicy, shared: SharedContext) -> Self {
        InProcessWitness {
            locator,
            library,
            policy,
            shared,
        }
    }
}

impl WitnessBackend for InProcessWitness {
    fn id(&self) -> BackendId {
        BackendId::WitnessRs
    }

    fn compute_witness(&self, circuit: &CircuitSpec) -> BenchResult<WitnessOutput> {
        let graph_name = circuit.graph.as_deref().ok_or_else(|| {
            BenchError::PrerequisiteMissing(format!("{} has no constraint graph", circuit.id))
        })?;
        let proving_key = self.locator.require(&circuit.proving_key)?;
        let graph = self.locator.require(graph_name)?;

        let inputs = circuit
            .input_rule
            .build(&self.locator.path_of(&circuit.sample_input))?;
        let inputs_json = serde_json::to_vec(&inputs)
            .map_err(|e| BenchError::WitnessComputationFailed(format!("input encoding: {e}")))?;

        let bridge = self.library.context().ok_or_else(|| {
            BenchError::WitnessComputationFailed("native library not linked: circom_state".into())
        })?;

        let mut slot = self.shared.lock()?;
        // A new run supersedes whatever context the previous circuit left.
        slot.take();

        let mut context = NativeContext::new(bridge)?;
        context.initialize(&proving_key, &graph)?;
        debug!(circuit = %circuit.id, "circuit context initialized");

        let (buffer, engine_ms) = context.generate_witness(&inputs_json, self.policy)?;
        let payload = WitnessPayload::from_buffer(circuit.id, self.id(), buffer)?;

        *slot = Some(LoadedContext {
            circuit: circuit.id,
            context,
        });

        Ok(WitnessOutput {
            payload,
            elapsed_ms: engine_ms,
            clock: Clock::Engine,
        })
    }
}

/// Groth16 prover driving the shared in-process context (`ark-works`).
pub struct AlgebraicProver {
    shared: SharedContext,
}

impl AlgebraicProver {
    pub fn new(shared: SharedContext) -> Self {
        AlgebraicProver { shared }
    }
}

impl ProverBackend for AlgebraicProver {
    fn id(&self) -> BackendId {
        BackendId::ArkWorks
    }

    fn prove(&self, circuit: &CircuitSpec, witness: Option<&WitnessPayload>) -> BenchResult<ProveOutput> {
        if witness.is_none() {
            return Err(BenchError::PrerequisiteMissing(format!(
                "no witness for {}",
                circuit.id
            )));
        }

        let mut slot = self.shared.lock()?;
        let loaded = match slot.as_mut() {
            Some(loaded) if loaded.circuit == circuit.id => loaded,
            _ => {
                return Err(BenchError::PrerequisiteMissing(format!(
                    "no initialized context for {}",
                    circuit.id
                )));
            }
        };

        let engine_ms = loaded.context.generate_proof()?;
        Ok(ProveOutput {
            payload: None,
            elapsed_ms: engine_ms,
            clock: Clock::Engine,
            proof: None,
            warning: None,
        })
    }
}

/// The `witness-rs` / `ark-works` pair over one shared context.
pub fn in_process_pair(locator: ArtifactLocator, library: NativeLibrary, policy: CapacityPolicy) -> BackendPair {
    let shared = SharedContext::new();
    BackendPair::new(
        Box::new(InProcessWitness::new(locator, library, policy, shared.clone())),
        Box::new(AlgebraicProver::new(shared)),
    )
}
