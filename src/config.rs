//! Run configuration, read from an optional TOML file and overridden by
//! command-line flags.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::backend::NativeOptions;
use crate::core::DEFAULT_BASE_URL;
use crate::ffi::{CapacityPolicy, PROOF_CAPACITY, WITNESS_CAPACITY};
use crate::BenchResult;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "circom-bench.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    pub artifacts_dir: PathBuf,
    pub base_url: String,
    /// Device column of the summary; detected when unset.
    pub device: Option<String>,
    pub witness_capacity: usize,
    pub witness_ceiling: usize,
    pub proof_capacity: usize,
    pub proof_ceiling: usize,
    /// Run the verifier after proving, for circuits with a verification key.
    pub verify: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let witness = CapacityPolicy::witness();
        let proof = CapacityPolicy::proof();
        BenchConfig {
            artifacts_dir: PathBuf::from("artifacts"),
            base_url: DEFAULT_BASE_URL.to_string(),
            device: None,
            witness_capacity: WITNESS_CAPACITY,
            witness_ceiling: witness.ceiling,
            proof_capacity: PROOF_CAPACITY,
            proof_ceiling: proof.ceiling,
            verify: false,
        }
    }
}

impl BenchConfig {
    /// Load `path`, or `circom-bench.toml` if it exists, or the defaults.
    pub fn load(path: Option<&Path>) -> BenchResult<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };
        Ok(Self::from_file(&path)?)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: BenchConfig = toml::from_str(text)?;
        anyhow::ensure!(config.witness_capacity > 0, "witness_capacity must be positive");
        anyhow::ensure!(config.proof_capacity > 0, "proof_capacity must be positive");
        Ok(config)
    }

    pub fn native_options(&self) -> NativeOptions {
        NativeOptions {
            witness: CapacityPolicy::new(self.witness_capacity, self.witness_ceiling),
            proof: CapacityPolicy::new(self.proof_capacity, self.proof_ceiling),
        }
    }

    /// Configured device label, or one detected from the host.
    pub fn device_label(&self) -> String {
        self.device
            .clone()
            .unwrap_or_else(|| crate::core::EnvironmentInfo::detect().device_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BenchConfig::default();
        assert_eq!(config.artifacts_dir, PathBuf::from("artifacts"));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.native_options(), NativeOptions::default());
        assert!(!config.verify);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BenchConfig::from_toml(
            r#"
            artifacts_dir = "/tmp/keys"
            device = "Pixel 8"
            witness_capacity = 1024
            verify = true
            "#,
        )
        .unwrap();
        assert_eq!(config.artifacts_dir, PathBuf::from("/tmp/keys"));
        assert_eq!(config.device_label(), "Pixel 8");
        assert_eq!(config.native_options().witness.initial, 1024);
        assert_eq!(config.proof_capacity, PROOF_CAPACITY);
        assert!(config.verify);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(BenchConfig::from_toml("iterations = 3").is_err());
    }

    #[test]
    fn test_missing_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = BenchConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert_eq!(err.kind(), "Anyhow");
        assert!(format!("{err:#}").contains("reading config"));
    }
}
