use anyhow::Result;

use chainfold_engine::orchestrator;
use chainfold_engine::result::PipelineResult;
use chainfold_engine::ProcessRunner;

use super::ChainArgs;

/// Execute the `run` command: resolve config and fold the series.
pub async fn execute(args: &ChainArgs) -> Result<()> {
    let config = args.resolve()?;

    tracing::info!(
        series = config.series.name,
        length = ?config.series.length,
        k = config.k,
        challenge = %config.challenge,
        "Pipeline validated"
    );

    let runner = ProcessRunner::with_timeout(config.tool_timeout());
    let result = orchestrator::run_pipeline(&config, &runner).await?;

    print_summary(&result);
    Ok(())
}

pub(crate) fn print_summary(result: &PipelineResult) {
    println!("Series '{}' folded successfully.", result.series);
    println!("  Segments:        {}", result.segments);
    println!("  Final batch:     {}", result.final_batch);
    println!("  Commit file:     {}", result.final_commit.display());
    println!("  Load info:       {}", result.final_loadinfo.display());
    println!("  Duration:        {:.2}s", result.duration_secs);
    let verify_secs = result.time_in("verify-initial") + result.time_in("verify");
    println!("    Verify:        {verify_secs:.3}s");
    println!("    Fold:          {:.3}s", result.time_in("fold"));
    println!("    Compose:       {:.3}s", result.time_in("compose"));
    println!("    Retire:        {:.3}s", result.time_in("retire"));
    println!("  Files removed:   {}", result.artifacts_deleted());
    if result.retention_failures() > 0 {
        println!("  Files kept (removal failed): {}", result.retention_failures());
        for record in result.retention.iter().flat_map(|r| r.failures()) {
            println!("    {}", record.path.display());
        }
    }

    // Machine-readable summary for scripts
    let json = serde_json::json!({
        "series": result.series,
        "segments": result.segments,
        "final_batch": result.final_batch.as_str(),
        "final_commit": result.final_commit.display().to_string(),
        "final_loadinfo": result.final_loadinfo.display().to_string(),
        "duration_secs": result.duration_secs,
        "fold_secs": result.time_in("fold"),
        "verify_secs": verify_secs,
        "artifacts_deleted": result.artifacts_deleted(),
        "retention_failures": result.retention_failures(),
    });
    println!("@@CHAIN_JSON@@{json}");
}
