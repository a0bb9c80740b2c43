pub mod plan;
pub mod prove;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use chainfold_engine::config::parser;
use chainfold_engine::config::types::{ChallengeStrategy, PipelineConfig};
use chainfold_engine::config::validator;

/// Flags shared by every command. Each one overrides the config file.
#[derive(Args, Debug, Default)]
pub struct ChainArgs {
    /// Series name (the prover's output name)
    #[arg(long)]
    pub name: Option<String>,
    /// Number of segments; read from the series manifest when omitted
    #[arg(long)]
    pub length: Option<u64>,
    /// Circuit size parameter
    #[arg(short)]
    pub k: Option<u32>,
    /// Transcript challenge (poseidon, sha, keccak)
    #[arg(long)]
    pub challenge: Option<ChallengeStrategy>,
    /// Circuit parameter directory
    #[arg(long)]
    pub params: Option<PathBuf>,
    /// Proof output directory
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Directory for batch descriptors
    #[arg(long)]
    pub commits: Option<PathBuf>,
    /// Pipeline YAML file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Kill any tool still running after this many seconds
    #[arg(long)]
    pub tool_timeout: Option<u64>,
}

impl ChainArgs {
    /// Load the config file (if any), apply flag overrides, then validate.
    pub fn resolve(&self) -> Result<PipelineConfig> {
        self.resolve_with(|_| {})
    }

    /// Like [`ChainArgs::resolve`], with command-specific overrides applied
    /// before validation.
    pub fn resolve_with(&self, extra: impl FnOnce(&mut PipelineConfig)) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => parser::parse_pipeline(path)
                .with_context(|| format!("Failed to parse pipeline: {}", path.display()))?,
            None => {
                let name = self
                    .name
                    .as_deref()
                    .context("--name is required when no --config file is given")?;
                PipelineConfig::for_series(name)
            }
        };
        self.apply(&mut config);
        extra(&mut config);
        validator::validate_pipeline(&config)?;
        Ok(config)
    }

    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(name) = &self.name {
            config.series.name.clone_from(name);
        }
        if self.length.is_some() {
            config.series.length = self.length;
        }
        if let Some(k) = self.k {
            config.k = k;
        }
        if let Some(challenge) = self.challenge {
            config.challenge = challenge;
        }
        if let Some(dir) = &self.params {
            config.layout.params_dir.clone_from(dir);
        }
        if let Some(dir) = &self.output {
            config.layout.output_dir.clone_from(dir);
        }
        if let Some(dir) = &self.commits {
            config.layout.commits_dir.clone_from(dir);
        }
        if self.tool_timeout.is_some() {
            config.tool_timeout_secs = self.tool_timeout;
        }
    }
}
