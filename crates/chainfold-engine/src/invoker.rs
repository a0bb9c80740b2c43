//! External tool invocation.
//!
//! [`ToolCommand`] is a fully built command line. [`ToolRunner`] executes
//! one and captures its output; [`invoke`] wraps a runner with the
//! pipeline's failure policy: stdout is always logged, stderr only on
//! failure, and any non-zero exit is fatal. Nothing is retried.
//!
//! The `*_command` builders encode the CLI contracts of the `batcher`
//! fold/verify tool and the `zkwasm` prover.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chainfold_types::naming::{batch_id, ArtifactLayout};
use tokio::process::Command;
use tokio::time;

use crate::config::types::ChallengeStrategy;
use crate::errors::PipelineError;

// ---------------------------------------------------------------------------
// Command lines
// ---------------------------------------------------------------------------

/// Program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Value following `flag`, if present.
    #[must_use]
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

// ---------------------------------------------------------------------------
// Runners
// ---------------------------------------------------------------------------

/// Why a tool produced no [`ToolOutput`].
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("failed to spawn: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Executes tool command lines.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `command` to completion and capture its output.
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, InvokeError>;
}

/// Runs commands as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Runner with no bound on tool run time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill and fail any tool still running after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, InvokeError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => time::timeout(limit, cmd.output())
                .await
                .map_err(|_| InvokeError::Timeout(limit))??,
            None => cmd.output().await?,
        };

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

/// Run `command` for pipeline step `step`, failing on any non-zero exit.
///
/// # Errors
///
/// Returns [`PipelineError::ExternalTool`] with the captured stderr on a
/// non-zero exit, [`PipelineError::ToolTimeout`] when the runner's bound
/// elapsed, and [`PipelineError::ToolSpawn`] if the tool could not start.
pub async fn invoke<R>(
    runner: &R,
    step: &str,
    command: &ToolCommand,
) -> Result<ToolOutput, PipelineError>
where
    R: ToolRunner + ?Sized,
{
    tracing::info!(step, command = %command, "Invoking external tool");

    let output = runner.run(command).await.map_err(|e| match e {
        InvokeError::Spawn(source) => PipelineError::ToolSpawn {
            command: command.to_string(),
            source,
        },
        InvokeError::Timeout(timeout) => PipelineError::ToolTimeout {
            step: step.to_string(),
            command: command.to_string(),
            timeout,
        },
    })?;

    for line in output.stdout.lines() {
        tracing::info!(step, "{}", line);
    }

    if !output.success() {
        for line in output.stderr.lines() {
            tracing::error!(step, "{}", line);
        }
        tracing::error!(step, exit_code = ?output.exit_code, "{} failed, early exit", step);
        return Err(PipelineError::ExternalTool {
            step: step.to_string(),
            command: command.to_string(),
            exit_code: output.exit_code,
            stderr: output.stderr,
        });
    }

    tracing::info!(step, "{} succeeded", step);
    Ok(output)
}

// ---------------------------------------------------------------------------
// Collaborator CLI contracts
// ---------------------------------------------------------------------------

fn batcher_base(batcher: &Path, layout: &ArtifactLayout) -> ToolCommand {
    ToolCommand::new(batcher)
        .arg("--param")
        .path_arg(&layout.params_dir)
        .arg("--output")
        .path_arg(&layout.output_dir)
}

/// `batcher --param P --output O verify --challenge C --info O/<name>.loadinfo.json`
///
/// `name` is either the series (checking the prover's segments) or a batch id.
#[must_use]
pub fn verify_command(
    batcher: &Path,
    layout: &ArtifactLayout,
    challenge: ChallengeStrategy,
    name: &str,
) -> ToolCommand {
    batcher_base(batcher, layout)
        .arg("verify")
        .arg("--challenge")
        .arg(challenge.as_str())
        .arg("--info")
        .path_arg(&layout.loadinfo_file(name))
}

/// `batcher --param P --output O batch -k K --challenge C --info <series manifest> [<prev batch loadinfo>] --name <batch id> --commits <commit file>`
///
/// Segment 0 has no predecessor, so the previous batch's load-info is only
/// passed for `idx > 0`.
#[must_use]
pub fn fold_command(
    batcher: &Path,
    layout: &ArtifactLayout,
    k: u32,
    challenge: ChallengeStrategy,
    series: &str,
    idx: u64,
) -> ToolCommand {
    let id = batch_id(series, idx);
    let mut cmd = batcher_base(batcher, layout)
        .arg("batch")
        .arg("-k")
        .arg(k.to_string())
        .arg("--challenge")
        .arg(challenge.as_str())
        .arg("--info")
        .path_arg(&layout.series_manifest(series));
    if idx > 0 {
        let prev = batch_id(series, idx - 1);
        cmd = cmd.path_arg(&layout.loadinfo_file(prev.as_str()));
    }
    cmd.arg("--name")
        .arg(id.as_str())
        .arg("--commits")
        .path_arg(&layout.commit_file(&id))
}

/// `zkwasm --params P <name> setup -k K`
#[must_use]
pub fn setup_command(zkwasm: &Path, params_dir: &Path, name: &str, k: u32) -> ToolCommand {
    ToolCommand::new(zkwasm)
        .arg("--params")
        .path_arg(params_dir)
        .arg(name)
        .arg("setup")
        .arg("-k")
        .arg(k.to_string())
}

/// `zkwasm --params P <name> prove --wasm W --output O [--public v1 v2 ...]`
#[must_use]
pub fn prove_command(
    zkwasm: &Path,
    params_dir: &Path,
    name: &str,
    wasm: &Path,
    public_inputs: &[String],
    output_dir: &Path,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(zkwasm)
        .arg("--params")
        .path_arg(params_dir)
        .arg(name)
        .arg("prove")
        .arg("--wasm")
        .path_arg(wasm)
        .arg("--output")
        .path_arg(output_dir);
    if !public_inputs.is_empty() {
        cmd = cmd.arg("--public");
        for value in public_inputs {
            cmd = cmd.arg(value.clone());
        }
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &ToolCommand) -> Vec<&str> {
        cmd.args.iter().map(String::as_str).collect()
    }

    #[test]
    fn verify_contract() {
        let layout = ArtifactLayout::default();
        let cmd = verify_command(
            Path::new("/bin/batcher"),
            &layout,
            ChallengeStrategy::Poseidon,
            "batch_proof_0",
        );
        assert_eq!(cmd.program, PathBuf::from("/bin/batcher"));
        assert_eq!(
            args(&cmd),
            vec![
                "--param",
                "params",
                "--output",
                "output",
                "verify",
                "--challenge",
                "poseidon",
                "--info",
                "output/batch_proof_0.loadinfo.json",
            ]
        );
    }

    #[test]
    fn fold_first_omits_predecessor() {
        let layout = ArtifactLayout::default();
        let cmd = fold_command(
            Path::new("batcher"),
            &layout,
            22,
            ChallengeStrategy::Poseidon,
            "proof",
            0,
        );
        assert_eq!(
            args(&cmd),
            vec![
                "--param",
                "params",
                "--output",
                "output",
                "batch",
                "-k",
                "22",
                "--challenge",
                "poseidon",
                "--info",
                "output/proof.loadinfo.json",
                "--name",
                "batch_proof_0",
                "--commits",
                "./batch_proof_0.json",
            ]
        );
    }

    #[test]
    fn fold_later_passes_predecessor_loadinfo() {
        let layout = ArtifactLayout::default();
        let cmd = fold_command(
            Path::new("batcher"),
            &layout,
            22,
            ChallengeStrategy::Sha,
            "proof",
            3,
        );
        assert_eq!(
            args(&cmd)[9..],
            [
                "--info",
                "output/proof.loadinfo.json",
                "output/batch_proof_2.loadinfo.json",
                "--name",
                "batch_proof_3",
                "--commits",
                "./batch_proof_3.json",
            ]
        );
        assert_eq!(cmd.flag_value("--challenge"), Some("sha"));
    }

    #[test]
    fn prover_contracts() {
        let setup = setup_command(Path::new("zkwasm"), Path::new("params"), "fib", 18);
        assert_eq!(setup.to_string(), "zkwasm --params params fib setup -k 18");

        let prove = prove_command(
            Path::new("zkwasm"),
            Path::new("params"),
            "fib",
            Path::new("fib.wasm"),
            &["25:i64".to_string(), "1:i64".to_string()],
            Path::new("output"),
        );
        assert_eq!(
            prove.to_string(),
            "zkwasm --params params fib prove --wasm fib.wasm --output output --public 25:i64 1:i64"
        );

        let prove = prove_command(
            Path::new("zkwasm"),
            Path::new("params"),
            "fib",
            Path::new("fib.wasm"),
            &[],
            Path::new("output"),
        );
        assert_eq!(prove.flag_value("--public"), None);
    }

    #[test]
    fn display_quotes_whitespace() {
        let cmd = ToolCommand::new("tool").arg("a b").arg("");
        assert_eq!(cmd.to_string(), "tool 'a b' ''");
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn sh(script: &str) -> ToolCommand {
            ToolCommand::new("sh").arg("-c").arg(script)
        }

        #[tokio::test]
        async fn captures_stdout_and_exit_code() {
            let out = ProcessRunner::new().run(&sh("echo folded")).await.unwrap();
            assert!(out.success());
            assert_eq!(out.stdout.trim(), "folded");
        }

        #[tokio::test]
        async fn non_zero_exit_is_fatal_with_stderr() {
            let err = invoke(&ProcessRunner::new(), "fold batch_p_0", &sh("echo bad >&2; exit 3"))
                .await
                .unwrap_err();
            match err {
                PipelineError::ExternalTool {
                    exit_code, stderr, ..
                } => {
                    assert_eq!(exit_code, Some(3));
                    assert_eq!(stderr.trim(), "bad");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn timeout_kills_tool() {
            let runner = ProcessRunner::with_timeout(Some(Duration::from_millis(100)));
            let err = invoke(&runner, "verify", &sh("sleep 5")).await.unwrap_err();
            assert!(matches!(err, PipelineError::ToolTimeout { .. }));
        }

        #[tokio::test]
        async fn missing_binary_is_spawn_error() {
            let cmd = ToolCommand::new("/nonexistent/chainfold-batcher");
            let err = invoke(&ProcessRunner::new(), "verify", &cmd).await.unwrap_err();
            assert!(matches!(err, PipelineError::ToolSpawn { .. }));
        }
    }
}
