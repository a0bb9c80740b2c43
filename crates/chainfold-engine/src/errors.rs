//! Pipeline error model.
//!
//! Every variant here is fatal to the run: the driver stops at the first one
//! and nothing is retried. Retention problems are not errors; they are
//! reported per file in a [`RetentionReport`](crate::retention::RetentionReport).

use std::path::PathBuf;
use std::time::Duration;

use chainfold_types::dsl::DslError;
use chainfold_types::manifest::ManifestError;

/// Fatal pipeline failure.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing tool location or invalid pipeline settings. Raised before any work.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The series manifest could not be used to learn the series length.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The DSL document for a batch could not be written.
    #[error(transparent)]
    Descriptor(#[from] DslError),

    /// A working directory could not be prepared.
    #[error("failed to prepare {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully.
    #[error("{step} failed ({}): {command}{}", describe_exit(.exit_code), format_stderr(.stderr))]
    ExternalTool {
        step: String,
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// An external tool ran past the configured bound and was killed.
    #[error("{step} timed out after {}s: {command}", .timeout.as_secs())]
    ToolTimeout {
        step: String,
        command: String,
        timeout: Duration,
    },

    /// An external tool could not be started at all.
    #[error("failed to launch {command}: {source}")]
    ToolSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{trimmed}")
    }
}

impl PipelineError {
    /// Shorthand for [`PipelineError::Configuration`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Returns `true` if the error came from an external tool invocation.
    #[must_use]
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            Self::ExternalTool { .. } | Self::ToolTimeout { .. } | Self::ToolSpawn { .. }
        )
    }
}
