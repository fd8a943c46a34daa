//! Multitree - builds the inner trees of a multitree lunch combo
//!
//! Orchestrates:
//! 1. Lunch combo loading (inner trees and the API domains they provide)
//! 2. Sandbox setup per inner tree (nsjail config with melded projects)
//! 3. Sequential `.inner_build` invocation, stopping at the first failure
//!
//! Any error ends the process with exit status 1.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multitree=info,convenient_innertree=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match cli.command {
        Commands::Build {
            combo,
            out_dir,
            nsjail,
            args,
        } => commands::build::execute(&combo, &out_dir, &nsjail, &args),
        Commands::Describe { combo, out_dir } => commands::describe::execute(&combo, &out_dir),
    }
}
