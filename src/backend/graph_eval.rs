//! Native graph evaluator (`witnesscalc`).

use std::ffi::c_ulong;

use tracing::debug;

use super::traits::{ArtifactLocator, WitnessBackend, WitnessOutput, WitnessPayload};
use crate::core::{BackendId, CircuitSpec, Clock};
use crate::ffi::native::classify;
use crate::ffi::{CapacityPolicy, NativeLibrary, c_len, negotiate};
use crate::{BenchError, BenchResult, whole_millis};

pub struct GraphEvaluatorWitness {
    locator: ArtifactLocator,
    library: NativeLibrary,
    policy: CapacityPolicy,
}

impl GraphEvaluatorWitness {
    pub fn new(locator: ArtifactLocator, library: NativeLibrary, policy: CapacityPolicy) -> Self {
        GraphEvaluatorWitness {
            locator,
            library,
            policy,
        }
    }
}

impl WitnessBackend for GraphEvaluatorWitness {
    fn id(&self) -> BackendId {
        BackendId::WitnessCalc
    }

    fn compute_witness(&self, circuit: &CircuitSpec) -> BenchResult<WitnessOutput> {
        let graph = self.locator.read(&circuit.graph_data)?;
        let inputs = self.locator.read(&circuit.sample_input)?;
        let evaluate = self.library.witnesscalc(circuit.id)?;
        let graph_len = c_len("graph data", graph.len())?;
        let inputs_len = c_len("input document", inputs.len())?;

        let negotiated = negotiate(
            ["witness"],
            self.policy,
            BenchError::WitnessComputationFailed,
            |bufs, errors| {
                let mut len: c_ulong = bufs[0].capacity_c();
                let status = unsafe {
                    evaluate(
                        graph.as_ptr().cast(),
                        graph_len,
                        inputs.as_ptr().cast(),
                        inputs_len,
                        bufs[0].as_mut_ptr(),
                        &mut len,
                        errors.as_mut_ptr(),
                        errors.capacity_c(),
                    )
                };
                bufs[0].record_claim(len);
                classify(status)
            },
        )?;

        debug!(circuit = %circuit.id, attempts = negotiated.attempts, "witness evaluated");
        let elapsed_ms = whole_millis(negotiated.elapsed);
        let [buffer] = negotiated.buffers;
        Ok(WitnessOutput {
            payload: WitnessPayload::from_buffer(circuit.id, self.id(), buffer)?,
            elapsed_ms,
            clock: Clock::WallClock,
        })
    }
}
