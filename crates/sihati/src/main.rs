mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            entities,
            config,
            output,
        } => cli::analyze::run(entities, config.as_deref(), output.as_deref()).await,
        Commands::Extract { file, config } => cli::extract::run(&file, config.as_deref()).await,
        Commands::Models { json } => cli::models::run(json),
    }
}
