//! The prover's load-info manifest (`<output>/<name>.loadinfo.json`).
//!
//! The driver only reads it to learn how many segments a series has and
//! where they live. Fields the fold tool adds beyond these are ignored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors raised while loading a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest {} not found", .path.display())]
    Missing { path: PathBuf },

    #[error("failed to read manifest {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest {} lists no proof segments", .path.display())]
    Empty { path: PathBuf },
}

/// One proof segment's artifact file names, relative to the output dir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPieceInfo {
    pub circuit: String,
    #[serde(default)]
    pub instance_size: u32,
    pub instance: String,
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<String>,
}

/// A load-info manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofLoadInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtype: Option<String>,
    pub proofs: Vec<ProofPieceInfo>,
}

impl ProofLoadInfo {
    /// Number of segments in the series.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.proofs.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }

    /// Load and validate a manifest. A manifest with no proofs is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if the file is missing, unreadable,
    /// malformed, or empty.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ManifestError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                ManifestError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let info: Self =
            serde_json::from_str(&content).map_err(|source| ManifestError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        if info.is_empty() {
            return Err(ManifestError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "proof",
        "k": 22,
        "hashtype": "Poseidon",
        "proofs": [
            {"circuit": "proof.circuit.data", "instance_size": 2,
             "instance": "proof.0.instance.data", "transcript": "proof.0.transcripts.data",
             "witness": "proof.0.witness.data"},
            {"circuit": "proof.circuit.data", "instance_size": 2,
             "instance": "proof.1.instance.data", "transcript": "proof.1.transcripts.data"}
        ],
        "param_dir": "params"
    }"#;

    #[test]
    fn load_counts_segments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proof.loadinfo.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let info = ProofLoadInfo::load(&path).unwrap();
        assert_eq!(info.name, "proof");
        assert_eq!(info.len(), 2);
        assert_eq!(info.k, Some(22));
        assert_eq!(info.proofs[1].witness, None);
    }

    #[test]
    fn missing_file() {
        let err = ProofLoadInfo::load(Path::new("/nonexistent/proof.loadinfo.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Missing { .. }));
    }

    #[test]
    fn malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proof.loadinfo.json");
        std::fs::write(&path, r#"{"name": "proof"}"#).unwrap();
        let err = ProofLoadInfo::load(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Malformed { .. }));
        assert!(err.to_string().contains("proof.loadinfo.json"));
    }

    #[test]
    fn empty_manifest_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proof.loadinfo.json");
        std::fs::write(&path, r#"{"name": "proof", "proofs": []}"#).unwrap();
        let err = ProofLoadInfo::load(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Empty { .. }));
    }
}
