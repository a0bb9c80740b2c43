mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::ChainArgs;

#[derive(Parser)]
#[command(
    name = "chainfold",
    version,
    about = "Fold a series of segment proofs into one chained commitment"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Fold existing segment proofs into a chain
    Run {
        #[command(flatten)]
        chain: ChainArgs,
    },
    /// Generate segment proofs with the prover, then fold them
    Prove {
        #[command(flatten)]
        chain: ChainArgs,
        /// Guest wasm image to prove
        #[arg(long)]
        wasm: Option<PathBuf>,
        /// Public inputs, e.g. `25:i64`
        #[arg(long, num_args = 1..)]
        public: Vec<String>,
        /// Reuse existing circuit parameters instead of running setup
        #[arg(long)]
        no_setup: bool,
    },
    /// Print every step and command line without running anything
    Plan {
        #[command(flatten)]
        chain: ChainArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run { chain } => commands::run::execute(&chain).await,
        Commands::Prove {
            chain,
            wasm,
            public,
            no_setup,
        } => commands::prove::execute(&chain, wasm, public, no_setup).await,
        Commands::Plan { chain } => commands::plan::execute(&chain),
    }
}
