//! Retirement of superseded batch artifacts.
//!
//! Once batch `idx` has been folded and verified, batch `idx - 1` is no
//! longer needed and its artifact set is deleted. Deletion is best-effort
//! per file: an absent file counts as already retired, any other failure is
//! logged and recorded in the [`RetentionReport`] but never aborts the run.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chainfold_types::naming::{batch_id, ArtifactKind, ArtifactLayout, BatchId};

/// What happened to one artifact file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    Deleted,
    AlreadyAbsent,
    Failed { kind: ErrorKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalRecord {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub outcome: RemovalOutcome,
}

/// Per-file outcome of retiring one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// The batch whose artifacts were targeted. `None` when there was no predecessor.
    pub retired: Option<BatchId>,
    pub records: Vec<RemovalRecord>,
}

impl RetentionReport {
    #[must_use]
    pub fn deleted(&self) -> usize {
        self.count(|o| matches!(o, RemovalOutcome::Deleted))
    }

    #[must_use]
    pub fn already_absent(&self) -> usize {
        self.count(|o| matches!(o, RemovalOutcome::AlreadyAbsent))
    }

    pub fn failures(&self) -> impl Iterator<Item = &RemovalRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, RemovalOutcome::Failed { .. }))
    }

    /// `true` when every file is gone.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    fn count(&self, pred: impl Fn(&RemovalOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }
}

fn remove_artifact(path: &Path) -> RemovalOutcome {
    match std::fs::remove_file(path) {
        Ok(()) => RemovalOutcome::Deleted,
        Err(e) if e.kind() == ErrorKind::NotFound => RemovalOutcome::AlreadyAbsent,
        Err(e) => RemovalOutcome::Failed {
            kind: e.kind(),
            message: e.to_string(),
        },
    }
}

/// Delete the artifact set of batch `idx - 1` of `series`.
///
/// Only call once batch `idx` has been folded and verified. Files of `idx`
/// and later batches are never touched. `idx == 0` has no predecessor and
/// yields an empty report.
#[must_use]
pub fn retire(layout: &ArtifactLayout, series: &str, idx: u64) -> RetentionReport {
    let Some(prev) = idx.checked_sub(1) else {
        return RetentionReport::default();
    };
    let id = batch_id(series, prev);
    tracing::info!(batch = %id, "Removing stale batch files");

    let records = layout
        .artifact_set(&id)
        .into_iter()
        .map(|(kind, path)| {
            let outcome = remove_artifact(&path);
            match &outcome {
                RemovalOutcome::Deleted => {
                    tracing::debug!(path = %path.display(), "Removed {kind}");
                }
                RemovalOutcome::AlreadyAbsent => {
                    tracing::debug!(path = %path.display(), "{kind} already absent");
                }
                RemovalOutcome::Failed { message, .. } => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %message,
                        "Failed to remove {kind}, continuing"
                    );
                }
            }
            RemovalRecord {
                kind,
                path,
                outcome,
            }
        })
        .collect();

    RetentionReport {
        retired: Some(id),
        records,
    }
}
