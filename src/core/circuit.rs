//! Circuit catalog: the benchmark circuits, their artifacts and input rules.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{BenchError, BenchResult};

/// Default host serving the circuit artifacts.
pub const DEFAULT_BASE_URL: &str = "https://ci-keys.zkmopro.org/";

/// Structured input map for the in-process witness engine: signal name to
/// decimal field elements.
pub type CircuitInputs = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitId {
    Keccak256,
    Sha256,
    Rsa,
    /// Standalone circuit used only by the exploration path.
    Main,
}

impl CircuitId {
    /// Benchmark circuits in run order.
    pub const BENCHMARK: [CircuitId; 3] = [CircuitId::Keccak256, CircuitId::Sha256, CircuitId::Rsa];

    pub fn name(&self) -> &'static str {
        match self {
            CircuitId::Keccak256 => "keccak256",
            CircuitId::Sha256 => "sha256",
            CircuitId::Rsa => "rsa",
            CircuitId::Main => "main",
        }
    }

    /// Suffix of the circuit's `witnesscalc_<suffix>` evaluator entry point.
    pub fn witnesscalc_symbol(&self) -> &'static str {
        match self {
            CircuitId::Keccak256 => "keccak256_256_test",
            CircuitId::Sha256 => "sha256_512",
            CircuitId::Rsa => "rsa_main",
            CircuitId::Main => "cncircuit",
        }
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CircuitId {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keccak256" | "keccak" => Ok(CircuitId::Keccak256),
            "sha256" | "sha" => Ok(CircuitId::Sha256),
            "rsa" => Ok(CircuitId::Rsa),
            "main" => Ok(CircuitId::Main),
            other => Err(BenchError::Message(format!("unknown circuit: {other}"))),
        }
    }
}

/// How the in-process engine's input map is built for a circuit.
#[derive(Debug, Clone)]
pub enum InputRule {
    /// Message bytes expanded to bits, least significant bit first.
    MessageBits {
        signal: &'static str,
        message: &'static [u8],
        width_bytes: usize,
    },
    /// The same value repeated `count` times.
    Repeat {
        signal: &'static str,
        value: &'static str,
        count: usize,
    },
    /// Fixed limb arrays per signal.
    Canned(&'static [(&'static str, &'static [&'static str])]),
    /// Read the circuit's sample-input document.
    SampleDocument,
}

impl InputRule {
    /// Build the structured input map. `sample_input` is only read for
    /// [`InputRule::SampleDocument`].
    pub fn build(&self, sample_input: &Path) -> BenchResult<CircuitInputs> {
        let mut inputs = CircuitInputs::new();
        match self {
            InputRule::MessageBits {
                signal,
                message,
                width_bytes,
            } => {
                let mut padded = message.to_vec();
                padded.resize((*width_bytes).max(message.len()), 0);
                let bits = bytes_to_bits(&padded)
                    .into_iter()
                    .map(|b| if b { "1" } else { "0" }.to_string())
                    .collect();
                inputs.insert(signal.to_string(), bits);
            }
            InputRule::Repeat {
                signal,
                value,
                count,
            } => {
                inputs.insert(signal.to_string(), vec![value.to_string(); *count]);
            }
            InputRule::Canned(signals) => {
                for (signal, limbs) in signals.iter() {
                    inputs.insert(
                        signal.to_string(),
                        limbs.iter().map(|l| l.to_string()).collect(),
                    );
                }
            }
            InputRule::SampleDocument => {
                let text = std::fs::read_to_string(sample_input).map_err(|e| {
                    BenchError::ArtifactMissing(format!("{}: {e}", sample_input.display()))
                })?;
                inputs = parse_input_document(&text)?;
            }
        }
        Ok(inputs)
    }
}

/// Parse a sample-input JSON document into an input map. Scalars become
/// single-element arrays; numbers and strings are both accepted.
pub fn parse_input_document(text: &str) -> BenchResult<CircuitInputs> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| BenchError::Message(format!("invalid input document: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| BenchError::Message("input document must be a JSON object".into()))?;

    let mut inputs = CircuitInputs::new();
    for (signal, v) in object {
        let mut limbs = Vec::new();
        flatten_limbs(v, &mut limbs).map_err(|e| {
            BenchError::Message(format!("signal {signal}: {e}"))
        })?;
        inputs.insert(signal.clone(), limbs);
    }
    Ok(inputs)
}

fn flatten_limbs(value: &serde_json::Value, out: &mut Vec<String>) -> Result<(), String> {
    match value {
        serde_json::Value::String(s) => out.push(s.clone()),
        serde_json::Value::Number(n) => out.push(n.to_string()),
        serde_json::Value::Array(items) => {
            for item in items {
                flatten_limbs(item, out)?;
            }
        }
        other => return Err(format!("unsupported value {other}")),
    }
    Ok(())
}

pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for j in 0..8 {
            bits.push((byte >> j) & 1 == 1);
        }
    }
    bits
}

/// Immutable description of one circuit and the artifacts it needs.
#[derive(Debug, Clone)]
pub struct CircuitSpec {
    pub id: CircuitId,
    /// Groth16 proving key (`.zkey`).
    pub proving_key: String,
    /// Constraint graph for the in-process engine (`.bin`).
    pub graph: Option<String>,
    /// Compiled graph data for the native evaluator (`.dat`).
    pub graph_data: String,
    /// Sample input document (`.json`).
    pub sample_input: String,
    pub verification_key: Option<String>,
    pub input_rule: InputRule,
}

impl CircuitSpec {
    /// Artifact ids this circuit requires, in catalog order.
    pub fn artifacts(&self) -> Vec<&str> {
        let mut ids = vec![self.proving_key.as_str()];
        if let Some(graph) = &self.graph {
            ids.push(graph);
        }
        ids.push(&self.graph_data);
        ids.push(&self.sample_input);
        if let Some(vk) = &self.verification_key {
            ids.push(vk);
        }
        ids
    }
}

/// A fixed set of circuits plus the host their artifacts come from.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub base_url: String,
    pub circuits: Vec<CircuitSpec>,
}

impl Catalog {
    /// The three benchmark circuits.
    pub fn reference(base_url: impl Into<String>) -> Self {
        Catalog {
            base_url: base_url.into(),
            circuits: vec![keccak256_spec(), sha256_spec(), rsa_spec()],
        }
    }

    /// The standalone circuit of the exploration path.
    pub fn exploration(base_url: impl Into<String>) -> Self {
        Catalog {
            base_url: base_url.into(),
            circuits: vec![main_spec()],
        }
    }

    pub fn circuit(&self, id: CircuitId) -> Option<&CircuitSpec> {
        self.circuits.iter().find(|c| c.id == id)
    }

    /// Distinct artifact ids across all circuits, first reference wins.
    pub fn distinct_artifacts(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for circuit in &self.circuits {
            for id in circuit.artifacts() {
                if !seen.iter().any(|s| s == id) {
                    seen.push(id.to_string());
                }
            }
        }
        seen
    }

    /// Remote location of an artifact.
    pub fn url_of(&self, artifact: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, artifact)
        } else {
            format!("{}/{}", self.base_url, artifact)
        }
    }
}

fn keccak256_spec() -> CircuitSpec {
    CircuitSpec {
        id: CircuitId::Keccak256,
        proving_key: "keccak256_256_test_final.zkey".into(),
        graph: Some("keccak256_256_test.bin".into()),
        graph_data: "keccak256_256_test.dat".into(),
        sample_input: "keccak256.json".into(),
        verification_key: None,
        input_rule: InputRule::MessageBits {
            signal: "in",
            message: b"test",
            width_bytes: 32,
        },
    }
}

fn sha256_spec() -> CircuitSpec {
    CircuitSpec {
        id: CircuitId::Sha256,
        proving_key: "sha256_512_final.zkey".into(),
        graph: Some("sha256_512.bin".into()),
        graph_data: "sha256_512.dat".into(),
        sample_input: "sha256.json".into(),
        verification_key: None,
        input_rule: InputRule::Repeat {
            signal: "in",
            value: "1",
            count: 512,
        },
    }
}

fn rsa_spec() -> CircuitSpec {
    CircuitSpec {
        id: CircuitId::Rsa,
        proving_key: "rsa_main_final.zkey".into(),
        graph: Some("rsa_main.bin".into()),
        graph_data: "rsa_main.dat".into(),
        sample_input: "input.json".into(),
        verification_key: None,
        input_rule: InputRule::Canned(RSA_INPUTS),
    }
}

fn main_spec() -> CircuitSpec {
    CircuitSpec {
        id: CircuitId::Main,
        proving_key: "main_final.zkey".into(),
        graph: None,
        graph_data: "cncircuit.dat".into(),
        sample_input: "input.json".into(),
        verification_key: Some("main_vkey.json".into()),
        input_rule: InputRule::SampleDocument,
    }
}

const RSA_INPUTS: &[(&str, &[&str])] = &[
    ("signature", RSA_SIGNATURE),
    ("modulus", RSA_MODULUS),
    ("base_message", RSA_BASE_MESSAGE),
];

const RSA_SIGNATURE: &[&str] = &[
    "3582320600048169363",
    "7163546589759624213",
    "18262551396327275695",
    "4479772254206047016",
    "1970274621151677644",
    "6547632513799968987",
    "921117808165172908",
    "7155116889028933260",
    "16769940396381196125",
    "17141182191056257954",
    "4376997046052607007",
    "17471823348423771450",
    "16282311012391954891",
    "70286524413490741",
    "1588836847166444745",
    "15693430141227594668",
    "13832254169115286697",
    "15936550641925323613",
    "323842208142565220",
    "6558662646882345749",
    "15268061661646212265",
    "14962976685717212593",
    "15773505053543368901",
    "9586594741348111792",
    "1455720481014374292",
    "13945813312010515080",
    "6352059456732816887",
    "17556873002865047035",
    "2412591065060484384",
    "11512123092407778330",
    "8499281165724578877",
    "12768005853882726493",
];

const RSA_MODULUS: &[&str] = &[
    "13792647154200341559",
    "12773492180790982043",
    "13046321649363433702",
    "10174370803876824128",
    "7282572246071034406",
    "1524365412687682781",
    "4900829043004737418",
    "6195884386932410966",
    "13554217876979843574",
    "17902692039595931737",
    "12433028734895890975",
    "15971442058448435996",
    "4591894758077129763",
    "11258250015882429548",
    "16399550288873254981",
    "8246389845141771315",
    "14040203746442788850",
    "7283856864330834987",
    "12297563098718697441",
    "13560928146585163504",
    "7380926829734048483",
    "14591299561622291080",
    "8439722381984777599",
    "17375431987296514829",
    "16727607878674407272",
    "3233954801381564296",
    "17255435698225160983",
    "15093748890170255670",
    "15810389980847260072",
    "11120056430439037392",
    "5866130971823719482",
    "13327552690270163501",
];

const RSA_BASE_MESSAGE: &[&str] = &[
    "18114495772705111902",
    "2254271930739856077",
    "2068851770",
    "0", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0",
    "0", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0",
];
