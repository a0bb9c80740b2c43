//! Orchestration crate for chained proof folding.
//!
//! Sequences the external fold/verify tool over a proof series, writes the
//! column-linkage DSL for each batch, and retires superseded artifacts.

pub mod config;
pub mod errors;
pub mod invoker;
pub mod orchestrator;
pub mod result;
pub mod retention;

// Re-export public API for convenience
pub use errors::PipelineError;
pub use invoker::{ProcessRunner, ToolCommand, ToolOutput, ToolRunner};
pub use orchestrator::{plan_pipeline, prove_and_run, run_pipeline, PipelineStep};
pub use result::{PipelineResult, ProveOutcome};
