//! Pipeline configuration model.

use std::path::PathBuf;
use std::time::Duration;

use chainfold_types::naming::ArtifactLayout;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

/// Environment variable naming the fold/verify tool.
pub const BATCHER_ENV: &str = "BATCHER";
/// Environment variable naming the prover tool.
pub const ZKWASM_ENV: &str = "ZKWASM";

pub const CONFIG_VERSION: &str = "1.0";
pub const DEFAULT_K: u32 = 22;

/// Transcript challenge strategy passed to the fold tool as `--challenge`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStrategy {
    #[default]
    Poseidon,
    Sha,
    Keccak,
}

impl ChallengeStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Poseidon => "poseidon",
            Self::Sha => "sha",
            Self::Keccak => "keccak",
        }
    }
}

impl std::fmt::Display for ChallengeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChallengeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "poseidon" => Ok(Self::Poseidon),
            "sha" => Ok(Self::Sha),
            "keccak" => Ok(Self::Keccak),
            other => Err(format!(
                "unknown challenge strategy '{other}' (expected poseidon, sha or keccak)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub name: String,
    /// Number of segments. Read from the prover's manifest when absent.
    #[serde(default)]
    pub length: Option<u64>,
}

/// Explicit tool locations. Each falls back to its environment variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub batcher: Option<PathBuf>,
    #[serde(default)]
    pub zkwasm: Option<PathBuf>,
}

impl ToolsConfig {
    /// Location of the fold/verify tool.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if neither the config nor
    /// `BATCHER` names one.
    pub fn batcher(&self) -> Result<PathBuf, PipelineError> {
        resolve_tool(self.batcher.as_ref(), BATCHER_ENV, "batcher")
    }

    /// Location of the prover tool.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if neither the config nor
    /// `ZKWASM` names one.
    pub fn zkwasm(&self) -> Result<PathBuf, PipelineError> {
        resolve_tool(self.zkwasm.as_ref(), ZKWASM_ENV, "zkwasm")
    }
}

fn resolve_tool(
    configured: Option<&PathBuf>,
    env_var: &str,
    binary: &str,
) -> Result<PathBuf, PipelineError> {
    if let Some(path) = configured {
        return Ok(path.clone());
    }
    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(PathBuf::from(value)),
        _ => Err(PipelineError::config(format!(
            "env var {env_var} is not set, `export {env_var}=/path/to/{binary}` to set it"
        ))),
    }
}

/// Proof generation run before folding (`setup` then `prove`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProveConfig {
    pub wasm: PathBuf,
    #[serde(default)]
    pub public: Vec<String>,
    /// Run `setup` before `prove`. Skip when circuit data already exists.
    #[serde(default = "default_true")]
    pub setup: bool,
}

fn default_true() -> bool {
    true
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_version")]
    pub version: String,
    pub series: SeriesConfig,
    /// Row-count parameter for the fold tool (`-k`).
    #[serde(default = "default_k")]
    pub k: u32,
    #[serde(default)]
    pub challenge: ChallengeStrategy,
    #[serde(default)]
    pub layout: ArtifactLayout,
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Upper bound on each external tool invocation. Unbounded when absent.
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
    #[serde(default)]
    pub prove: Option<ProveConfig>,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

fn default_k() -> u32 {
    DEFAULT_K
}

impl PipelineConfig {
    /// Defaults for `series`: conventional directories, `poseidon`, no timeout.
    #[must_use]
    pub fn for_series(name: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            series: SeriesConfig {
                name: name.into(),
                length: None,
            },
            k: default_k(),
            challenge: ChallengeStrategy::default(),
            layout: ArtifactLayout::default(),
            tools: ToolsConfig::default(),
            tool_timeout_secs: None,
            prove: None,
        }
    }

    #[must_use]
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }
}
