//! Column-linkage DSL handed to the fold tool for each batch.
//!
//! A [`BatchDescriptor`] tells the fold tool which column of the previous
//! batch this batch consumes (`absorb`) and which of its own columns it
//! forwards to the next batch (`expose`). Two image columns carry the chain:
//! every non-terminal batch exposes its [`ColumnName::PostImage`] and the
//! following batch absorbs it as its [`ColumnName::Image`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::naming::{batch_id, BatchId};

/// Wire name of the pre-state image column (consumed).
pub const IMAGE_COLUMN: &str = "img_col";
/// Wire name of the post-state image column (produced).
pub const POST_IMAGE_COLUMN: &str = "post_img_col";

/// Errors raised while parsing, validating, or writing a descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DslError {
    #[error("malformed batch descriptor: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid batch descriptor: {0}")]
    Invalid(String),

    #[error("batch descriptor i/o on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

/// The two image-carrying columns linking adjacent batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnName {
    #[serde(rename = "img_col")]
    Image,
    #[serde(rename = "post_img_col")]
    PostImage,
}

impl ColumnName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => IMAGE_COLUMN,
            Self::PostImage => POST_IMAGE_COLUMN,
        }
    }
}

/// A column of one segment in a proof series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateColumn {
    pub name: String,
    pub proof_idx: u64,
    pub column_name: ColumnName,
}

/// A previously folded batch instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateInstance {
    pub name: String,
    pub proof_idx: u64,
    pub group_idx: u64,
}

/// Two columns asserted equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquivalencePair {
    pub source: TemplateColumn,
    pub target: TemplateColumn,
}

/// This batch consumes `target` from the prior batch `instance_idx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AbsorbPair {
    pub instance_idx: TemplateInstance,
    pub target: TemplateColumn,
}

/// The DSL document for one fold step.
///
/// `equivalents` is carried for compatibility with the fold tool's schema;
/// no composer populates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchDescriptor {
    pub equivalents: Vec<EquivalencePair>,
    pub expose: Vec<TemplateColumn>,
    pub absorb: Vec<AbsorbPair>,
}

// ---------------------------------------------------------------------------
// Segment position
// ---------------------------------------------------------------------------

/// Where a segment sits in its series. Decides which composer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentPosition {
    /// The only segment of a length-1 series.
    Single,
    First,
    Middle,
    Last,
}

impl SegmentPosition {
    /// Position of segment `idx` in a series of `len` segments.
    ///
    /// Returns `None` when `idx` is outside the series.
    #[must_use]
    pub fn of(idx: u64, len: u64) -> Option<Self> {
        if idx >= len {
            return None;
        }
        Some(match (idx, len) {
            (0, 1) => Self::Single,
            (0, _) => Self::First,
            (i, n) if i == n - 1 => Self::Last,
            _ => Self::Middle,
        })
    }

    /// Whether this segment starts the chain (and checks the prover's manifest).
    #[must_use]
    pub fn is_initial(self) -> bool {
        matches!(self, Self::Single | Self::First)
    }

    /// Whether this segment has a predecessor whose artifacts can be retired.
    #[must_use]
    pub fn has_predecessor(self) -> bool {
        matches!(self, Self::Middle | Self::Last)
    }
}

impl std::fmt::Display for SegmentPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Single => "single",
            Self::First => "first",
            Self::Middle => "middle",
            Self::Last => "last",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Composers
// ---------------------------------------------------------------------------

fn post_image(series: &str, idx: u64) -> TemplateColumn {
    TemplateColumn {
        name: series.to_string(),
        proof_idx: idx,
        column_name: ColumnName::PostImage,
    }
}

/// Absorb the predecessor's exposed column as this segment's image.
fn absorb_previous(series: &str, idx: u64, next_group_idx: u64) -> AbsorbPair {
    assert!(idx > 0, "segment 0 has no predecessor");
    let prev = idx - 1;
    AbsorbPair {
        instance_idx: TemplateInstance {
            name: batch_id(series, prev).as_str().to_string(),
            proof_idx: prev,
            group_idx: next_group_idx,
        },
        target: TemplateColumn {
            name: series.to_string(),
            proof_idx: idx,
            column_name: ColumnName::Image,
        },
    }
}

/// Descriptor for segment 0: seeds the chain with its post-image.
#[must_use]
pub fn compose_first(series: &str) -> BatchDescriptor {
    BatchDescriptor {
        equivalents: Vec::new(),
        expose: vec![post_image(series, 0)],
        absorb: Vec::new(),
    }
}

/// Descriptor for an interior segment `idx` (`idx > 0`).
///
/// # Panics
///
/// Panics if `idx == 0`; segment 0 has no predecessor to absorb.
#[must_use]
pub fn compose_middle(series: &str, idx: u64, next_group_idx: u64) -> BatchDescriptor {
    BatchDescriptor {
        equivalents: Vec::new(),
        expose: vec![post_image(series, idx)],
        absorb: vec![absorb_previous(series, idx, next_group_idx)],
    }
}

/// Descriptor for the final segment `idx` (`idx > 0`): terminates the chain.
///
/// # Panics
///
/// Panics if `idx == 0`; segment 0 has no predecessor to absorb.
#[must_use]
pub fn compose_last(series: &str, idx: u64, next_group_idx: u64) -> BatchDescriptor {
    BatchDescriptor {
        equivalents: Vec::new(),
        expose: Vec::new(),
        absorb: vec![absorb_previous(series, idx, next_group_idx)],
    }
}

/// Descriptor for a length-1 series: nothing to absorb, nothing to forward.
#[must_use]
pub fn compose_single(_series: &str) -> BatchDescriptor {
    BatchDescriptor::default()
}

/// Compose the descriptor for segment `idx` at `position`.
///
/// The absorbed instance is tagged with group `idx + 1`.
#[must_use]
pub fn compose(position: SegmentPosition, series: &str, idx: u64) -> BatchDescriptor {
    match position {
        SegmentPosition::Single => compose_single(series),
        SegmentPosition::First => compose_first(series),
        SegmentPosition::Middle => compose_middle(series, idx, idx + 1),
        SegmentPosition::Last => compose_last(series, idx, idx + 1),
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

impl BatchDescriptor {
    /// Parse and validate a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`DslError::Json`] on malformed JSON or unknown fields, and
    /// [`DslError::Invalid`] when the linkage is inconsistent.
    pub fn from_json(json: &str) -> Result<Self, DslError> {
        let descriptor: Self = serde_json::from_str(json)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Compact, deterministic JSON encoding.
    ///
    /// # Errors
    ///
    /// Returns [`DslError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, DslError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check the column linkage rules.
    ///
    /// # Errors
    ///
    /// Returns [`DslError::Invalid`] describing every violation found.
    pub fn validate(&self) -> Result<(), DslError> {
        let mut errors = Vec::new();

        for col in &self.expose {
            if col.column_name != ColumnName::PostImage {
                errors.push(format!(
                    "expose of {}[{}] must use {POST_IMAGE_COLUMN}",
                    col.name, col.proof_idx
                ));
            }
        }

        for pair in &self.absorb {
            let target = &pair.target;
            let instance = &pair.instance_idx;
            if target.column_name != ColumnName::Image {
                errors.push(format!(
                    "absorb into {}[{}] must target {IMAGE_COLUMN}",
                    target.name, target.proof_idx
                ));
            }
            if target.proof_idx == 0 || instance.proof_idx != target.proof_idx - 1 {
                errors.push(format!(
                    "absorb into {}[{}] must consume the immediately preceding batch, got proof_idx {}",
                    target.name, target.proof_idx, instance.proof_idx
                ));
            }
            let expected: BatchId = batch_id(&target.name, instance.proof_idx);
            if instance.name != expected.as_str() {
                errors.push(format!(
                    "absorbed instance '{}' does not match expected '{expected}'",
                    instance.name
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DslError::Invalid(errors.join("; ")))
        }
    }
}

/// Write `descriptor` to `path` as compact JSON.
///
/// # Errors
///
/// Returns [`DslError::Io`] if the file cannot be written.
pub fn write_descriptor(path: &Path, descriptor: &BatchDescriptor) -> Result<(), DslError> {
    let json = descriptor.to_json()?;
    std::fs::write(path, json).map_err(|source| DslError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Read and validate a descriptor from `path`.
///
/// # Errors
///
/// Returns [`DslError::Io`] if the file cannot be read, or any
/// parse/validation error from [`BatchDescriptor::from_json`].
pub fn read_descriptor(path: &Path) -> Result<BatchDescriptor, DslError> {
    let json = std::fs::read_to_string(path).map_err(|source| DslError::Io {
        path: path.display().to_string(),
        source,
    })?;
    BatchDescriptor::from_json(&json)
}
