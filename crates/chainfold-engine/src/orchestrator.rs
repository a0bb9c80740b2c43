//! Pipeline driver: the per-segment folding state machine.
//!
//! For a series of `N` segments every index is classified by
//! [`SegmentPosition`] and expanded into steps:
//!
//! | position | steps                                                     |
//! |----------|-----------------------------------------------------------|
//! | first    | verify initial, compose, fold, verify                     |
//! | middle   | compose, fold (with predecessor), verify, retire(i - 1)   |
//! | last     | compose, fold (with predecessor), verify, retire(i - 1)   |
//! | single   | verify initial, compose, fold, verify                     |
//!
//! Steps run strictly in order. Fold `i` consumes batch `i - 1`'s load-info,
//! so nothing is parallel, and the first failing step aborts the run. A
//! restart always begins at segment 0.

use std::path::PathBuf;
use std::time::Instant;

use chainfold_types::dsl::{compose, write_descriptor, SegmentPosition};
use chainfold_types::manifest::ProofLoadInfo;
use chainfold_types::naming::{batch_id, ArtifactKind, ArtifactLayout};

use crate::config::types::{ChallengeStrategy, PipelineConfig, BATCHER_ENV};
use crate::errors::PipelineError;
use crate::invoker::{
    fold_command, invoke, prove_command, setup_command, verify_command, ToolCommand, ToolRunner,
};
use crate::result::{PipelineResult, ProveOutcome, StepTiming};
use crate::retention::{retire, RetentionReport};

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// One unit of work in a folding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    /// Check the prover's segment manifest before folding anything.
    VerifyInitial,
    /// Write the DSL document for `segment`.
    Compose {
        segment: u64,
        position: SegmentPosition,
    },
    Fold {
        segment: u64,
    },
    /// Verify the batch produced by folding `segment`.
    Verify {
        segment: u64,
    },
    /// Delete the artifacts of batch `segment - 1`.
    Retire {
        segment: u64,
    },
}

impl PipelineStep {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::VerifyInitial => "verify-initial",
            Self::Compose { .. } => "compose",
            Self::Fold { .. } => "fold",
            Self::Verify { .. } => "verify",
            Self::Retire { .. } => "retire",
        }
    }

    #[must_use]
    pub fn segment(&self) -> Option<u64> {
        match *self {
            Self::VerifyInitial => None,
            Self::Compose { segment, .. }
            | Self::Fold { segment }
            | Self::Verify { segment }
            | Self::Retire { segment } => Some(segment),
        }
    }
}

/// Expand the state machine for a series of `len` segments.
#[must_use]
pub fn plan_steps(len: u64) -> Vec<PipelineStep> {
    let mut steps = Vec::new();
    for segment in 0..len {
        let Some(position) = SegmentPosition::of(segment, len) else {
            break;
        };
        if position.is_initial() {
            steps.push(PipelineStep::VerifyInitial);
        }
        steps.push(PipelineStep::Compose { segment, position });
        steps.push(PipelineStep::Fold { segment });
        steps.push(PipelineStep::Verify { segment });
        if position.has_predecessor() {
            steps.push(PipelineStep::Retire { segment });
        }
    }
    steps
}

/// A step together with what it would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub step: PipelineStep,
    pub description: String,
    /// Tool command line for verify/fold steps.
    pub command: Option<ToolCommand>,
    /// Files written (compose) or deleted (retire).
    pub files: Vec<PathBuf>,
}

// ---------------------------------------------------------------------------
// PipelineRun
// ---------------------------------------------------------------------------

/// Ephemeral state of one folding run. Never persisted.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    series: String,
    segments: u64,
    k: u32,
    challenge: ChallengeStrategy,
    layout: ArtifactLayout,
    batcher: PathBuf,
}

impl PipelineRun {
    #[must_use]
    pub fn new(config: &PipelineConfig, batcher: PathBuf, segments: u64) -> Self {
        Self {
            series: config.series.name.clone(),
            segments,
            k: config.k,
            challenge: config.challenge,
            layout: config.layout.clone(),
            batcher,
        }
    }

    #[must_use]
    pub fn segments(&self) -> u64 {
        self.segments
    }

    /// Human-readable step name, also used as the failing step in errors.
    #[must_use]
    pub fn describe(&self, step: &PipelineStep) -> String {
        match *step {
            PipelineStep::VerifyInitial => format!("verify {}", self.series),
            PipelineStep::Compose { segment, position } => format!(
                "compose {} ({position})",
                batch_id(&self.series, segment)
            ),
            PipelineStep::Fold { segment } => {
                format!("fold {}", batch_id(&self.series, segment))
            }
            PipelineStep::Verify { segment } => {
                format!("verify {}", batch_id(&self.series, segment))
            }
            PipelineStep::Retire { segment } => format!(
                "retire {}",
                batch_id(&self.series, segment.saturating_sub(1))
            ),
        }
    }

    /// Tool command line for a step, if the step runs a tool.
    #[must_use]
    pub fn command_for(&self, step: &PipelineStep) -> Option<ToolCommand> {
        match *step {
            PipelineStep::VerifyInitial => Some(verify_command(
                &self.batcher,
                &self.layout,
                self.challenge,
                &self.series,
            )),
            PipelineStep::Fold { segment } => Some(fold_command(
                &self.batcher,
                &self.layout,
                self.k,
                self.challenge,
                &self.series,
                segment,
            )),
            PipelineStep::Verify { segment } => Some(verify_command(
                &self.batcher,
                &self.layout,
                self.challenge,
                batch_id(&self.series, segment).as_str(),
            )),
            PipelineStep::Compose { .. } | PipelineStep::Retire { .. } => None,
        }
    }

    fn files_for(&self, step: &PipelineStep) -> Vec<PathBuf> {
        match *step {
            PipelineStep::Compose { segment, .. } => {
                vec![self.layout.commit_file(&batch_id(&self.series, segment))]
            }
            PipelineStep::Retire { segment } if segment > 0 => self
                .layout
                .artifact_set(&batch_id(&self.series, segment - 1))
                .into_iter()
                .map(|(_, path)| path)
                .collect(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn plan(&self) -> Vec<PlannedStep> {
        plan_steps(self.segments)
            .into_iter()
            .map(|step| PlannedStep {
                description: self.describe(&step),
                command: self.command_for(&step),
                files: self.files_for(&step),
                step,
            })
            .collect()
    }

    /// Execute one step. Retire steps push their report onto `retention`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; retention never fails.
    pub async fn execute<R>(
        &self,
        runner: &R,
        step: &PipelineStep,
        retention: &mut Vec<RetentionReport>,
    ) -> Result<(), PipelineError>
    where
        R: ToolRunner + ?Sized,
    {
        let name = self.describe(step);
        match *step {
            PipelineStep::Compose { segment, position } => {
                let descriptor = compose(position, &self.series, segment);
                let path = self.layout.commit_file(&batch_id(&self.series, segment));
                write_descriptor(&path, &descriptor)?;
                tracing::debug!(path = %path.display(), "Wrote batch descriptor");
            }
            PipelineStep::Retire { segment } => {
                let report = retire(&self.layout, &self.series, segment);
                if !report.is_clean() {
                    tracing::warn!(
                        failures = report.failures().count(),
                        "Retention left files behind"
                    );
                }
                retention.push(report);
            }
            PipelineStep::VerifyInitial
            | PipelineStep::Fold { .. }
            | PipelineStep::Verify { .. } => {
                if let Some(command) = self.command_for(step) {
                    invoke(runner, &name, &command).await?;
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Number of segments: the configured length, or the count in the prover's manifest.
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] for a zero length and
/// [`PipelineError::Manifest`] if the manifest is missing, malformed or empty.
pub fn series_length(config: &PipelineConfig) -> Result<u64, PipelineError> {
    match config.series.length {
        Some(0) => Err(PipelineError::config("series length must be at least 1")),
        Some(len) => Ok(len),
        None => {
            let path = config.layout.series_manifest(&config.series.name);
            let info = ProofLoadInfo::load(&path)?;
            tracing::info!(
                manifest = %path.display(),
                segments = info.len(),
                "Read series length from manifest"
            );
            Ok(info.len())
        }
    }
}

fn prepare_dir(path: &std::path::Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Fold the whole series into one chained commitment.
///
/// # Errors
///
/// Returns the first fatal error: missing tool, unusable manifest, DSL write
/// failure, or any tool failure. No later step runs after an error.
pub async fn run_pipeline<R>(
    config: &PipelineConfig,
    runner: &R,
) -> Result<PipelineResult, PipelineError>
where
    R: ToolRunner + ?Sized,
{
    let start = Instant::now();
    let batcher = config.tools.batcher()?;
    let segments = series_length(config)?;
    prepare_dir(&config.layout.commits_dir)?;

    let run = PipelineRun::new(config, batcher, segments);
    tracing::info!(
        series = config.series.name,
        segments,
        k = config.k,
        challenge = %config.challenge,
        "Starting folding pipeline"
    );

    let mut retention = Vec::new();
    let mut steps = Vec::new();
    for step in plan_steps(segments) {
        tracing::info!(
            series = config.series.name,
            segment = ?step.segment(),
            step = step.label(),
            "{}",
            run.describe(&step)
        );
        let step_start = Instant::now();
        run.execute(runner, &step, &mut retention).await?;
        steps.push(StepTiming {
            step,
            duration_secs: step_start.elapsed().as_secs_f64(),
        });
    }

    let final_batch = batch_id(&config.series.name, segments - 1);
    let result = PipelineResult {
        series: config.series.name.clone(),
        segments,
        final_commit: config.layout.commit_file(&final_batch),
        final_loadinfo: config
            .layout
            .artifact_path(ArtifactKind::LoadInfo, &final_batch),
        final_batch,
        retention,
        steps,
        duration_secs: start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        series = result.series,
        batch = %result.final_batch,
        artifacts_deleted = result.artifacts_deleted(),
        retention_failures = result.retention_failures(),
        duration_secs = result.duration_secs,
        "Folding pipeline completed"
    );
    Ok(result)
}

/// Describe every step of a run without executing anything.
///
/// The batcher location falls back to a `$BATCHER` placeholder when unset.
///
/// # Errors
///
/// Returns an error only if the series length cannot be determined.
pub fn plan_pipeline(config: &PipelineConfig) -> Result<Vec<PlannedStep>, PipelineError> {
    let batcher = config
        .tools
        .batcher()
        .unwrap_or_else(|_| PathBuf::from(format!("${BATCHER_ENV}")));
    let segments = series_length(config)?;
    Ok(PipelineRun::new(config, batcher, segments).plan())
}

/// Generate the segment proofs (`setup`, then `prove`) and fold them.
///
/// Both tool locations are resolved before anything runs.
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] if the config has no `prove`
/// section or a tool location is missing, otherwise the first fatal error
/// of proof generation or folding.
pub async fn prove_and_run<R>(
    config: &PipelineConfig,
    runner: &R,
) -> Result<ProveOutcome, PipelineError>
where
    R: ToolRunner + ?Sized,
{
    let prove = config
        .prove
        .as_ref()
        .ok_or_else(|| PipelineError::config("no prove settings (wasm image) configured"))?;
    let zkwasm = config.tools.zkwasm()?;
    config.tools.batcher()?;

    let name = &config.series.name;
    let layout = &config.layout;
    prepare_dir(&layout.params_dir)?;
    prepare_dir(&layout.output_dir)?;

    let setup_secs = if prove.setup {
        let started = Instant::now();
        let cmd = setup_command(&zkwasm, &layout.params_dir, name, config.k);
        invoke(runner, &format!("setup {name}"), &cmd).await?;
        Some(started.elapsed().as_secs_f64())
    } else {
        None
    };

    let started = Instant::now();
    let cmd = prove_command(
        &zkwasm,
        &layout.params_dir,
        name,
        &prove.wasm,
        &prove.public,
        &layout.output_dir,
    );
    invoke(runner, &format!("prove {name}"), &cmd).await?;
    let prove_secs = started.elapsed().as_secs_f64();

    let pipeline = run_pipeline(config, runner).await?;
    Ok(ProveOutcome {
        setup_secs,
        prove_secs,
        pipeline,
    })
}
