//! Batch identifiers and the on-disk artifact naming scheme.
//!
//! Every artifact path in a folding run is derived from a single
//! [`BatchId`]. Components never format artifact names themselves; they go
//! through [`ArtifactLayout`] so the fold tool, the verifier and the
//! retention pass always agree on which file belongs to which batch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Prefix shared by every batch identifier.
pub const BATCH_PREFIX: &str = "batch_";

/// Default directory for circuit and verifying-key data.
pub const DEFAULT_PARAMS_DIR: &str = "params";
/// Default directory for proofs, transcripts and load-info manifests.
pub const DEFAULT_OUTPUT_DIR: &str = "output";
/// Default directory for batch commit (DSL) files.
pub const DEFAULT_COMMITS_DIR: &str = ".";

// ---------------------------------------------------------------------------
// BatchId
// ---------------------------------------------------------------------------

/// Identifier of one batch in a chain: `batch_<series>_<idx>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    /// Build the identifier for segment `idx` of `series`.
    #[must_use]
    pub fn new(series: &str, idx: u64) -> Self {
        Self(format!("{BATCH_PREFIX}{series}_{idx}"))
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split an identifier back into `(series, idx)`.
    ///
    /// Only canonical identifiers are accepted: the index must be a decimal
    /// number without leading zeros, so that `parse(new(s, i)) == (s, i)`
    /// and nothing else maps onto the same pair.
    #[must_use]
    pub fn parse(id: &str) -> Option<(String, u64)> {
        let rest = id.strip_prefix(BATCH_PREFIX)?;
        let (series, idx) = rest.rsplit_once('_')?;
        if idx.is_empty() || !idx.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if idx.len() > 1 && idx.starts_with('0') {
            return None;
        }
        let idx = idx.parse().ok()?;
        Some((series.to_string(), idx))
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BatchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Shorthand for [`BatchId::new`].
#[must_use]
pub fn batch_id(series: &str, idx: u64) -> BatchId {
    BatchId::new(series, idx)
}

// ---------------------------------------------------------------------------
// Artifact kinds
// ---------------------------------------------------------------------------

/// Directory class an artifact is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactDir {
    Params,
    Output,
    Commits,
}

/// One file of a batch's artifact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// `<output>/<id>.0.instance.data`
    Instance,
    /// `<output>/<id>.0.transcripts.data`
    Transcript,
    /// `<output>/<id>.loadinfo.json`
    LoadInfo,
    /// `<params>/<id>.circuit.data`
    CircuitData,
    /// `<params>/<id>.circuit.data.vkey.data`
    VerifyingKey,
    /// `<commits>/<id>.json`
    Commit,
}

impl ArtifactKind {
    /// Every artifact a fold step produces, in deletion order.
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Instance,
        ArtifactKind::Transcript,
        ArtifactKind::LoadInfo,
        ArtifactKind::CircuitData,
        ArtifactKind::VerifyingKey,
        ArtifactKind::Commit,
    ];

    /// File-name suffix appended to the batch identifier.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Instance => ".0.instance.data",
            Self::Transcript => ".0.transcripts.data",
            Self::LoadInfo => ".loadinfo.json",
            Self::CircuitData => ".circuit.data",
            Self::VerifyingKey => ".circuit.data.vkey.data",
            Self::Commit => ".json",
        }
    }

    /// Directory class the artifact lives in.
    #[must_use]
    pub fn dir(self) -> ArtifactDir {
        match self {
            Self::Instance | Self::Transcript | Self::LoadInfo => ArtifactDir::Output,
            Self::CircuitData | Self::VerifyingKey => ArtifactDir::Params,
            Self::Commit => ArtifactDir::Commits,
        }
    }

    /// Bare file name of this artifact for `id`.
    #[must_use]
    pub fn file_name(self, id: &BatchId) -> String {
        format!("{}{}", id.as_str(), self.suffix())
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Instance => "instance",
            Self::Transcript => "transcript",
            Self::LoadInfo => "loadinfo",
            Self::CircuitData => "circuit",
            Self::VerifyingKey => "vkey",
            Self::Commit => "commit",
        };
        f.write_str(label)
    }
}

/// Recover `(series, idx, kind)` from a bare artifact file name.
///
/// Longer suffixes are tried first so `.loadinfo.json` is never mistaken for
/// a commit file.
#[must_use]
pub fn parse_artifact_file_name(file_name: &str) -> Option<(String, u64, ArtifactKind)> {
    let mut kinds = ArtifactKind::ALL;
    kinds.sort_by_key(|k| std::cmp::Reverse(k.suffix().len()));
    kinds.into_iter().find_map(|kind| {
        let stem = file_name.strip_suffix(kind.suffix())?;
        let (series, idx) = BatchId::parse(stem)?;
        Some((series, idx, kind))
    })
}

// ---------------------------------------------------------------------------
// ArtifactLayout
// ---------------------------------------------------------------------------

/// The three directories a folding run reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLayout {
    #[serde(default = "default_params_dir")]
    pub params_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_commits_dir")]
    pub commits_dir: PathBuf,
}

fn default_params_dir() -> PathBuf {
    PathBuf::from(DEFAULT_PARAMS_DIR)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_commits_dir() -> PathBuf {
    PathBuf::from(DEFAULT_COMMITS_DIR)
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            params_dir: default_params_dir(),
            output_dir: default_output_dir(),
            commits_dir: default_commits_dir(),
        }
    }
}

impl ArtifactLayout {
    /// Layout rooted at `root`, using the default sub-directory names.
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            params_dir: root.join(DEFAULT_PARAMS_DIR),
            output_dir: root.join(DEFAULT_OUTPUT_DIR),
            commits_dir: root.to_path_buf(),
        }
    }

    #[must_use]
    pub fn dir(&self, dir: ArtifactDir) -> &Path {
        match dir {
            ArtifactDir::Params => &self.params_dir,
            ArtifactDir::Output => &self.output_dir,
            ArtifactDir::Commits => &self.commits_dir,
        }
    }

    /// Load-info manifest for either a batch or the prover's segment series.
    #[must_use]
    pub fn loadinfo_file(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}{}", ArtifactKind::LoadInfo.suffix()))
    }

    /// The prover's manifest listing the series' segments.
    #[must_use]
    pub fn series_manifest(&self, series: &str) -> PathBuf {
        self.loadinfo_file(series)
    }

    /// Commit (DSL) file handed to the fold tool for `id`.
    #[must_use]
    pub fn commit_file(&self, id: &BatchId) -> PathBuf {
        self.artifact_path(ArtifactKind::Commit, id)
    }

    #[must_use]
    pub fn artifact_path(&self, kind: ArtifactKind, id: &BatchId) -> PathBuf {
        self.dir(kind.dir()).join(kind.file_name(id))
    }

    /// Every file belonging to batch `id`.
    #[must_use]
    pub fn artifact_set(&self, id: &BatchId) -> Vec<(ArtifactKind, PathBuf)> {
        ArtifactKind::ALL
            .into_iter()
            .map(|kind| (kind, self.artifact_path(kind, id)))
            .collect()
    }
}
