// assay/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug assay run ... pour voir les détails
    // Logs sur stderr: stdout reste réservé au rapport (--format json)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            project_dir,
            select,
            format,
        } => commands::run::execute(project_dir, select, format).await,
        Commands::Plan { project_dir } => commands::plan::execute(project_dir),
        Commands::Clean { project_dir } => commands::clean::execute(project_dir),
    }
}
