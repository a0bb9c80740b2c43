//! Pipeline execution result types.

use std::path::PathBuf;

use chainfold_types::naming::BatchId;

use crate::orchestrator::PipelineStep;
use crate::retention::RetentionReport;

/// Timing of one executed step.
#[derive(Debug, Clone)]
pub struct StepTiming {
    pub step: PipelineStep,
    pub duration_secs: f64,
}

/// Result of a completed folding run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub series: String,
    pub segments: u64,
    /// The last batch of the chain; its commit file is the series proof.
    pub final_batch: BatchId,
    pub final_commit: PathBuf,
    pub final_loadinfo: PathBuf,
    pub retention: Vec<RetentionReport>,
    pub steps: Vec<StepTiming>,
    pub duration_secs: f64,
}

impl PipelineResult {
    /// Total artifact files deleted across all retention passes.
    #[must_use]
    pub fn artifacts_deleted(&self) -> usize {
        self.retention.iter().map(RetentionReport::deleted).sum()
    }

    /// Total files that could not be deleted.
    #[must_use]
    pub fn retention_failures(&self) -> usize {
        self.retention.iter().map(|r| r.failures().count()).sum()
    }

    /// Seconds spent in steps of the given label.
    #[must_use]
    pub fn time_in(&self, label: &str) -> f64 {
        self.steps
            .iter()
            .filter(|t| t.step.label() == label)
            .fold(0.0, |acc, t| acc + t.duration_secs)
    }
}

/// Result of `setup` + `prove` followed by folding.
#[derive(Debug, Clone)]
pub struct ProveOutcome {
    pub setup_secs: Option<f64>,
    pub prove_secs: f64,
    pub pipeline: PipelineResult,
}
