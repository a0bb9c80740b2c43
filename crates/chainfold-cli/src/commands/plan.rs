use anyhow::Result;

use chainfold_engine::orchestrator;

use super::ChainArgs;

/// Execute the `plan` command: print each step and its command line.
pub fn execute(args: &ChainArgs) -> Result<()> {
    let config = args.resolve()?;
    let plan = orchestrator::plan_pipeline(&config)?;

    println!(
        "Plan for series '{}' ({} steps):",
        config.series.name,
        plan.len()
    );
    for (i, planned) in plan.iter().enumerate() {
        println!("{:>3}. {}", i + 1, planned.description);
        if let Some(command) = &planned.command {
            println!("       $ {command}");
        }
        let verb = match planned.step.label() {
            "retire" => "rm",
            _ => "write",
        };
        for file in &planned.files {
            println!("       {verb} {}", file.display());
        }
    }
    Ok(())
}
