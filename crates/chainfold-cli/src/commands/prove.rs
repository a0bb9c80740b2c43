use std::path::PathBuf;

use anyhow::Result;

use chainfold_engine::config::types::ProveConfig;
use chainfold_engine::orchestrator;
use chainfold_engine::ProcessRunner;

use super::ChainArgs;

/// Execute the `prove` command: setup and prove the guest, then fold the
/// segments it produced.
///
/// `--wasm` replaces the config file's `prove` section; `--public` and
/// `--no-setup` adjust whichever section ends up in effect.
pub async fn execute(
    args: &ChainArgs,
    wasm: Option<PathBuf>,
    public: Vec<String>,
    no_setup: bool,
) -> Result<()> {
    let config = args.resolve_with(|config| {
        if let Some(wasm) = wasm {
            config.prove = Some(ProveConfig {
                wasm,
                public: Vec::new(),
                setup: true,
            });
        }
        if let Some(prove) = config.prove.as_mut() {
            if !public.is_empty() {
                prove.public = public;
            }
            if no_setup {
                prove.setup = false;
            }
        }
    })?;

    let runner = ProcessRunner::with_timeout(config.tool_timeout());
    let outcome = orchestrator::prove_and_run(&config, &runner).await?;

    if let Some(secs) = outcome.setup_secs {
        println!("Setup completed in {secs:.2}s.");
    }
    println!("Prove completed in {:.2}s.", outcome.prove_secs);
    super::run::print_summary(&outcome.pipeline);
    Ok(())
}
