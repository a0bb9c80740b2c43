//! Fake external tools for driving the pipeline without a prover.
//!
//! The fake `batcher` materializes a batch's artifact set when asked to fold
//! and refuses to fold when the commit file or the predecessor's load-info is
//! missing, so ordering and retention mistakes surface as tool failures. The
//! fake `zkwasm` writes the series manifest on `prove`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chainfold_engine::config::types::{PipelineConfig, ProveConfig};
use chainfold_engine::invoker::{InvokeError, ToolCommand, ToolOutput, ToolRunner};
use chainfold_types::naming::{ArtifactKind, ArtifactLayout, BatchId};

type FailPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

pub struct FakeTools {
    layout: ArtifactLayout,
    segments: u64,
    calls: Mutex<Vec<ToolCommand>>,
    fail_on: Option<FailPredicate>,
}

impl FakeTools {
    pub fn new(layout: &ArtifactLayout) -> Self {
        Self {
            layout: layout.clone(),
            segments: 0,
            calls: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    /// Fail (exit 1) the call whose summary equals `summary`.
    pub fn failing_on(layout: &ArtifactLayout, summary: &str) -> Self {
        let summary = summary.to_string();
        Self {
            fail_on: Some(Box::new(move |s| s == summary)),
            ..Self::new(layout)
        }
    }

    /// Number of segments the fake prover emits.
    pub fn with_prover_segments(mut self, segments: u64) -> Self {
        self.segments = segments;
        self
    }

    pub fn calls(&self) -> Vec<ToolCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// One short line per call, e.g. `fold batch_proof_1`.
    pub fn summaries(&self) -> Vec<String> {
        self.calls().iter().map(summarize).collect()
    }

    fn fold(&self, command: &ToolCommand) -> Result<(), String> {
        let name = command.flag_value("--name").ok_or("missing --name")?;
        let (series, idx) = BatchId::parse(name).ok_or("bad batch name")?;
        let id = BatchId::new(&series, idx);

        let commits = command.flag_value("--commits").ok_or("missing --commits")?;
        if !Path::new(commits).exists() {
            return Err(format!("commit file {commits} not written before fold"));
        }
        if idx > 0 {
            let prev = self
                .layout
                .artifact_path(ArtifactKind::LoadInfo, &BatchId::new(&series, idx - 1));
            if !prev.exists() {
                return Err(format!("predecessor {} already removed", prev.display()));
            }
        }

        for (kind, path) in self.layout.artifact_set(&id) {
            if kind == ArtifactKind::Commit {
                continue;
            }
            std::fs::create_dir_all(path.parent().unwrap()).map_err(|e| e.to_string())?;
            std::fs::write(&path, b"folded").map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn prove(&self, command: &ToolCommand) -> Result<(), String> {
        let name = &command.args[2];
        write_manifest(&self.layout, name, self.segments);
        Ok(())
    }
}

#[async_trait]
impl ToolRunner for FakeTools {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, InvokeError> {
        self.calls.lock().unwrap().push(command.clone());
        let summary = summarize(command);

        if self.fail_on.as_ref().is_some_and(|f| f(&summary)) {
            return Ok(ToolOutput {
                stdout: String::new(),
                stderr: format!("{summary}: injected failure"),
                exit_code: Some(1),
            });
        }

        let outcome = if summary.starts_with("fold ") {
            self.fold(command)
        } else if summary.starts_with("prove ") {
            self.prove(command)
        } else {
            Ok(())
        };

        Ok(match outcome {
            Ok(()) => ToolOutput {
                stdout: format!("{summary}: ok\n"),
                stderr: String::new(),
                exit_code: Some(0),
            },
            Err(msg) => ToolOutput {
                stdout: String::new(),
                stderr: msg,
                exit_code: Some(2),
            },
        })
    }
}

fn summarize(command: &ToolCommand) -> String {
    let program = command
        .program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match program.as_str() {
        "batcher" => match command.args.get(4).map(String::as_str) {
            Some("verify") => {
                let info = command.flag_value("--info").unwrap_or_default();
                let file = Path::new(info)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!(
                    "verify {}",
                    file.strip_suffix(ArtifactKind::LoadInfo.suffix())
                        .unwrap_or(&file)
                )
            }
            Some("batch") => format!("fold {}", command.flag_value("--name").unwrap_or_default()),
            other => format!("batcher {other:?}"),
        },
        "zkwasm" => format!(
            "{} {}",
            command.args.get(3).map(String::as_str).unwrap_or_default(),
            command.args.get(2).map(String::as_str).unwrap_or_default()
        ),
        other => other.to_string(),
    }
}

/// Write a prover manifest listing `segments` proofs for `series`.
pub fn write_manifest(layout: &ArtifactLayout, series: &str, segments: u64) -> PathBuf {
    let proofs: Vec<_> = (0..segments)
        .map(|i| {
            serde_json::json!({
                "circuit": format!("{series}.circuit.data"),
                "instance_size": 1,
                "instance": format!("{series}.{i}.instance.data"),
                "transcript": format!("{series}.{i}.transcripts.data"),
            })
        })
        .collect();
    let manifest = serde_json::json!({
        "name": series,
        "k": 22,
        "hashtype": "Poseidon",
        "proofs": proofs,
    });
    let path = layout.series_manifest(series);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, manifest.to_string()).unwrap();
    path
}

/// Config rooted at `root` with fake tool names and an explicit length.
pub fn config_in(root: &Path, series: &str, length: Option<u64>) -> PipelineConfig {
    let mut config = PipelineConfig::for_series(series);
    config.series.length = length;
    config.layout = ArtifactLayout::rooted_at(root);
    config.tools.batcher = Some(PathBuf::from("batcher"));
    config.tools.zkwasm = Some(PathBuf::from("zkwasm"));
    config
}

pub fn with_prove(mut config: PipelineConfig) -> PipelineConfig {
    config.prove = Some(ProveConfig {
        wasm: PathBuf::from("fib.wasm"),
        public: vec!["25:i64".to_string()],
        setup: true,
    });
    config
}

/// All artifact files of a batch that exist on disk.
pub fn existing_artifacts(layout: &ArtifactLayout, id: &BatchId) -> Vec<ArtifactKind> {
    layout
        .artifact_set(id)
        .into_iter()
        .filter(|(_, path)| path.exists())
        .map(|(kind, _)| kind)
        .collect()
}
