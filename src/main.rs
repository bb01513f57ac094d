//! graphmem - knowledge-graph memory engine for agents
//!
//! Command line entry point: loads configuration, builds the engine and
//! runs one subcommand.

mod bootstrap;
mod cli;
mod commands;
mod logging;

use clap::Parser;
use tracing::{error, info};

use graphmem_config::ConfigLoader;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::load_or_default(cli.config.as_deref())?;
    if let Some(mode) = &cli.mode {
        config.memory.mode = mode.clone();
    }

    logging::init_tracing(cli.log_level.as_deref(), &config.logging)?;
    commands::check_config(&config)?;

    if let Commands::CheckConfig = cli.command {
        info!("Configuration is valid");
        return Ok(());
    }

    let engine = bootstrap::build_engine(&config).await?;

    let outcome = match cli.command {
        Commands::Tools { all } => commands::list_tools(engine.clone(), all),
        Commands::Call { tool, params } => commands::call_tool(engine.clone(), &tool, &params).await,
        Commands::Status => commands::status(&engine).await,
        Commands::CheckConfig => Ok(()),
    };

    if let Err(e) = engine.close().await {
        error!(backend = %engine.backend(), "Failed to close store: {}", e);
    }
    outcome
}
