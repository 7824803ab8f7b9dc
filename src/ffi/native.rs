//! Table of native entry points.
//!
//! Every native symbol is held as a function pointer so the backends never
//! name a linked symbol directly. With the `native` feature the table is
//! populated from the linked libraries; tests and builds without the feature
//! fill it by hand (or leave it empty, in which case each backend reports
//! "native library not linked").

use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_ulong, c_ulonglong, c_void};

use crate::core::CircuitId;
use crate::ffi::buffer::CallStatus;
use crate::{BenchError, BenchResult};

pub const STATUS_OK: c_int = 0;
pub const STATUS_ERROR: c_int = 1;
pub const STATUS_SHORT_BUFFER: c_int = 2;
pub const STATUS_INVALID_WITNESS_LENGTH: c_int = 3;

pub const VERIFY_VALID: c_int = 0;
pub const VERIFY_INVALID: c_int = 1;

/// `witnesscalc_<circuit>(graph, graph_len, json, json_len, wtns, *wtns_len, err, err_cap)`
pub type WitnessCalcFn = unsafe extern "C" fn(
    *const c_char,
    c_ulong,
    *const c_char,
    c_ulong,
    *mut c_char,
    *mut c_ulong,
    *mut c_char,
    c_ulong,
) -> c_int;

/// `groth16_prover(pk, pk_len, wtns, wtns_len, proof, *proof_len, public, *public_len, err, err_cap)`
pub type Groth16ProverFn = unsafe extern "C" fn(
    *const c_void,
    c_ulong,
    *const c_void,
    c_ulong,
    *mut c_char,
    *mut c_ulong,
    *mut c_char,
    *mut c_ulong,
    *mut c_char,
    c_ulong,
) -> c_int;

/// `groth16_verify(proof, public, vkey, err, err_cap)`
pub type Groth16VerifyFn =
    unsafe extern "C" fn(*const c_char, *const c_char, *const c_char, *mut c_char, c_ulong) -> c_int;

pub type ContextNewFn = unsafe extern "C" fn() -> *mut c_void;
pub type ContextFreeFn = unsafe extern "C" fn(*mut c_void);
/// `(handle, zkey_path, graph_path, err, err_cap)`
pub type ContextInitializeFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, *const c_char, *mut c_char, c_ulong) -> c_int;
/// `(handle, inputs_json, json_len, wtns, *wtns_len, *elapsed_ms, err, err_cap)`
pub type ContextWitnessFn = unsafe extern "C" fn(
    *mut c_void,
    *const c_char,
    c_ulong,
    *mut c_char,
    *mut c_ulong,
    *mut c_ulonglong,
    *mut c_char,
    c_ulong,
) -> c_int;
/// `(handle, *elapsed_ms, err, err_cap)`
pub type ContextProveFn =
    unsafe extern "C" fn(*mut c_void, *mut c_ulonglong, *mut c_char, c_ulong) -> c_int;

/// C bridge over the in-process witness engine and its Groth16 prover.
#[derive(Debug, Clone, Copy)]
pub struct ContextBridge {
    pub new: ContextNewFn,
    pub free: ContextFreeFn,
    pub initialize: ContextInitializeFn,
    pub generate_witness: ContextWitnessFn,
    pub generate_proof: ContextProveFn,
}

/// Map a witness-evaluator or prover status code to a call outcome.
pub fn classify(code: c_int) -> CallStatus {
    match code {
        STATUS_OK => CallStatus::Ok,
        STATUS_SHORT_BUFFER => CallStatus::ShortBuffer,
        STATUS_INVALID_WITNESS_LENGTH => CallStatus::Failed {
            code,
            message: "invalid witness length".to_string(),
        },
        other => CallStatus::Failed {
            code: other,
            message: String::new(),
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct NativeLibrary {
    witnesscalc: HashMap<CircuitId, WitnessCalcFn>,
    prover: Option<Groth16ProverFn>,
    verifier: Option<Groth16VerifyFn>,
    context: Option<ContextBridge>,
}

impl NativeLibrary {
    /// A table with no entry points.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Entry points from the linked native libraries.
    #[cfg(feature = "native")]
    pub fn linked() -> Self {
        use linked::*;

        NativeLibrary::empty()
            .with_witnesscalc(CircuitId::Keccak256, witnesscalc_keccak256_256_test)
            .with_witnesscalc(CircuitId::Sha256, witnesscalc_sha256_512)
            .with_witnesscalc(CircuitId::Rsa, witnesscalc_rsa_main)
            .with_witnesscalc(CircuitId::Main, witnesscalc_cncircuit)
            .with_prover(groth16_prover)
            .with_verifier(groth16_verify)
            .with_context(ContextBridge {
                new: circom_state_new,
                free: circom_state_free,
                initialize: circom_state_initialize,
                generate_witness: circom_state_generate_witness,
                generate_proof: circom_state_generate_proof,
            })
    }

    #[cfg(not(feature = "native"))]
    pub fn linked() -> Self {
        tracing::debug!("built without the `native` feature; native backends are unavailable");
        Self::empty()
    }

    pub fn with_witnesscalc(mut self, circuit: CircuitId, f: WitnessCalcFn) -> Self {
        self.witnesscalc.insert(circuit, f);
        self
    }

    pub fn with_prover(mut self, f: Groth16ProverFn) -> Self {
        self.prover = Some(f);
        self
    }

    pub fn with_verifier(mut self, f: Groth16VerifyFn) -> Self {
        self.verifier = Some(f);
        self
    }

    pub fn with_context(mut self, bridge: ContextBridge) -> Self {
        self.context = Some(bridge);
        self
    }

    pub fn witnesscalc(&self, circuit: CircuitId) -> BenchResult<WitnessCalcFn> {
        self.witnesscalc.get(&circuit).copied().ok_or_else(|| {
            BenchError::WitnessComputationFailed(format!(
                "native library not linked: witnesscalc_{}",
                circuit.witnesscalc_symbol()
            ))
        })
    }

    pub fn prover(&self) -> BenchResult<Groth16ProverFn> {
        self.prover.ok_or_else(|| {
            BenchError::ProofGenerationFailed("native library not linked: groth16_prover".into())
        })
    }

    pub fn verifier(&self) -> BenchResult<Groth16VerifyFn> {
        self.verifier.ok_or_else(|| {
            BenchError::VerificationFailed("native library not linked: groth16_verify".into())
        })
    }

    pub fn context(&self) -> Option<ContextBridge> {
        self.context
    }
}

#[cfg(feature = "native")]
mod linked {
    use std::ffi::{c_char, c_int, c_ulong, c_ulonglong, c_void};

    #[link(name = "rapidsnark")]
    unsafe extern "C" {
        pub fn groth16_prover(
            zkey: *const c_void,
            zkey_len: c_ulong,
            wtns: *const c_void,
            wtns_len: c_ulong,
            proof: *mut c_char,
            proof_len: *mut c_ulong,
            public: *mut c_char,
            public_len: *mut c_ulong,
            err: *mut c_char,
            err_cap: c_ulong,
        ) -> c_int;

        pub fn groth16_verify(
            proof: *const c_char,
            public: *const c_char,
            vkey: *const c_char,
            err: *mut c_char,
            err_cap: c_ulong,
        ) -> c_int;
    }

    macro_rules! witnesscalc_symbols {
        ($($lib:literal => $name:ident),* $(,)?) => {
            $(
                #[link(name = $lib)]
                unsafe extern "C" {
                    pub fn $name(
                        graph: *const c_char,
                        graph_len: c_ulong,
                        json: *const c_char,
                        json_len: c_ulong,
                        wtns: *mut c_char,
                        wtns_len: *mut c_ulong,
                        err: *mut c_char,
                        err_cap: c_ulong,
                    ) -> c_int;
                }
            )*
        };
    }

    witnesscalc_symbols! {
        "witnesscalc_keccak256_256_test" => witnesscalc_keccak256_256_test,
        "witnesscalc_sha256_512" => witnesscalc_sha256_512,
        "witnesscalc_rsa_main" => witnesscalc_rsa_main,
        "witnesscalc_cncircuit" => witnesscalc_cncircuit,
    }

    #[link(name = "circom_state")]
    unsafe extern "C" {
        pub fn circom_state_new() -> *mut c_void;
        pub fn circom_state_free(handle: *mut c_void);
        pub fn circom_state_initialize(
            handle: *mut c_void,
            zkey_path: *const c_char,
            graph_path: *const c_char,
            err: *mut c_char,
            err_cap: c_ulong,
        ) -> c_int;
        pub fn circom_state_generate_witness(
            handle: *mut c_void,
            inputs_json: *const c_char,
            json_len: c_ulong,
            wtns: *mut c_char,
            wtns_len: *mut c_ulong,
            elapsed_ms: *mut c_ulonglong,
            err: *mut c_char,
            err_cap: c_ulong,
        ) -> c_int;
        pub fn circom_state_generate_proof(
            handle: *mut c_void,
            elapsed_ms: *mut c_ulonglong,
            err: *mut c_char,
            err_cap: c_ulong,
        ) -> c_int;
    }
}
