//! Semantic validation for parsed pipeline configuration values.

use anyhow::{bail, Result};

use crate::config::types::{PipelineConfig, CONFIG_VERSION};

/// Largest `-k` the fold tool accepts.
pub const MAX_K: u32 = 32;

/// Series names end up inside file names and command lines.
fn validate_series_name(name: &str, errors: &mut Vec<String>) {
    if name.trim().is_empty() {
        errors.push("Series name must not be empty".to_string());
        return;
    }
    if name.chars().any(|c| c == '/' || c == '\\' || c.is_whitespace()) {
        errors.push(format!(
            "Series name '{name}' must not contain path separators or whitespace"
        ));
    }
}

/// Validate a parsed pipeline configuration.
///
/// # Errors
///
/// Returns an error listing every validation failure found.
pub fn validate_pipeline(config: &PipelineConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != CONFIG_VERSION {
        errors.push(format!(
            "Unsupported pipeline version '{}', expected '{CONFIG_VERSION}'",
            config.version
        ));
    }

    validate_series_name(&config.series.name, &mut errors);

    if config.series.length == Some(0) {
        errors.push("Series length must be at least 1".to_string());
    }

    if config.k == 0 || config.k > MAX_K {
        errors.push(format!("k must be between 1 and {MAX_K}, got {}", config.k));
    }

    if config.tool_timeout_secs == Some(0) {
        errors.push("tool_timeout_secs must be > 0".to_string());
    }

    for (name, dir) in [
        ("params_dir", &config.layout.params_dir),
        ("output_dir", &config.layout.output_dir),
        ("commits_dir", &config.layout.commits_dir),
    ] {
        if dir.as_os_str().is_empty() {
            errors.push(format!("layout.{name} must not be empty"));
        }
    }

    if let Some(prove) = &config.prove {
        if prove.wasm.as_os_str().is_empty() {
            errors.push("prove.wasm must name a WASM image".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Pipeline validation failed:\n  - {}", errors.join("\n  - "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::config::types::ProveConfig;

    #[test]
    fn default_config_is_valid() {
        validate_pipeline(&PipelineConfig::for_series("proof")).unwrap();
    }

    #[test]
    fn empty_name_rejected() {
        let config = PipelineConfig::for_series("  ");
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("Series name must not be empty"), "got: {err}");
    }

    #[test]
    fn name_with_separator_rejected() {
        let config = PipelineConfig::for_series("../proof");
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("path separators"), "got: {err}");
    }

    #[test]
    fn zero_length_rejected() {
        let mut config = PipelineConfig::for_series("proof");
        config.series.length = Some(0);
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("at least 1"), "got: {err}");
    }

    #[test]
    fn k_bounds() {
        let mut config = PipelineConfig::for_series("proof");
        config.k = 0;
        assert!(validate_pipeline(&config).is_err());
        config.k = MAX_K + 1;
        assert!(validate_pipeline(&config).is_err());
        config.k = MAX_K;
        assert!(validate_pipeline(&config).is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = PipelineConfig::for_series("proof");
        config.tool_timeout_secs = Some(0);
        assert!(validate_pipeline(&config).is_err());
    }

    #[test]
    fn all_errors_reported_together() {
        let mut config = PipelineConfig::for_series("");
        config.version = "2.0".to_string();
        config.k = 0;
        config.layout.output_dir = PathBuf::new();
        config.prove = Some(ProveConfig {
            wasm: PathBuf::new(),
            public: vec![],
            setup: true,
        });
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("Unsupported pipeline version '2.0'"));
        assert!(err.contains("Series name"));
        assert!(err.contains("k must be"));
        assert!(err.contains("layout.output_dir"));
        assert!(err.contains("prove.wasm"));
    }
}
