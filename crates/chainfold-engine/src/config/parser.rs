//! Pipeline YAML parsing with environment variable substitution.
//!
//! `${VAR}` is replaced by the variable's value; `${VAR:-fallback}` uses
//! `fallback` when the variable is unset.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use crate::config::types::PipelineConfig;

static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid env var regex")
});

/// Substitute `${VAR}` and `${VAR:-fallback}` references.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is unset and has
/// no fallback.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut missing = Vec::new();

    let substituted = ENV_VAR_RE.replace_all(input, |cap: &Captures<'_>| {
        let var_name = &cap[1];
        match (std::env::var(var_name), cap.get(2)) {
            (Ok(val), _) => val,
            (Err(_), Some(fallback)) => fallback.as_str().to_string(),
            (Err(_), None) => {
                missing.push(var_name.to_string());
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }

    Ok(substituted.into_owned())
}

/// Parse a pipeline YAML string.
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_pipeline_str(yaml_str: &str) -> Result<PipelineConfig> {
    let substituted = substitute_env_vars(yaml_str)?;
    let config: PipelineConfig =
        serde_yaml::from_str(&substituted).context("Failed to parse pipeline YAML")?;
    Ok(config)
}

/// Parse a pipeline YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn parse_pipeline(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file: {}", path.display()))?;
    parse_pipeline_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_set_variables() {
        std::env::set_var("CF_TEST_PARAMS", "/mnt/params");
        let result = substitute_env_vars("params_dir: ${CF_TEST_PARAMS}").unwrap();
        assert_eq!(result, "params_dir: /mnt/params");
        std::env::remove_var("CF_TEST_PARAMS");
    }

    #[test]
    fn fallback_used_when_unset() {
        let result = substitute_env_vars("k: ${CF_TEST_UNSET_K:-20}").unwrap();
        assert_eq!(result, "k: 20");
    }

    #[test]
    fn set_variable_beats_fallback() {
        std::env::set_var("CF_TEST_SET_K", "24");
        let result = substitute_env_vars("k: ${CF_TEST_SET_K:-20}").unwrap();
        assert_eq!(result, "k: 24");
        std::env::remove_var("CF_TEST_SET_K");
    }

    #[test]
    fn no_references_passthrough() {
        let input = "series:\n  name: proof";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn all_missing_variables_reported() {
        let err = substitute_env_vars("${CF_MISSING_X} ${CF_MISSING_Y}")
            .unwrap_err()
            .to_string();
        assert!(err.contains("CF_MISSING_X"), "got: {err}");
        assert!(err.contains("CF_MISSING_Y"), "got: {err}");
    }

    #[test]
    fn parse_pipeline_with_substitution() {
        std::env::set_var("CF_TEST_BATCHER", "/opt/batcher");
        let yaml = r"
series:
  name: fib
  length: 3
tools:
  batcher: ${CF_TEST_BATCHER}
";
        let config = parse_pipeline_str(yaml).unwrap();
        assert_eq!(config.series.name, "fib");
        assert_eq!(config.series.length, Some(3));
        assert_eq!(
            config.tools.batcher.as_deref(),
            Some(Path::new("/opt/batcher"))
        );
        std::env::remove_var("CF_TEST_BATCHER");
    }

    #[test]
    fn parse_invalid_yaml_errors() {
        assert!(parse_pipeline_str("series: [unclosed").is_err());
    }

    #[test]
    fn parse_pipeline_file_not_found() {
        let err = parse_pipeline(Path::new("/nonexistent/chain.yaml"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("Failed to read pipeline file"));
    }
}
