//! champwiki CLI - resilient champion wiki lookups
//!
//! Loads configuration, installs logging, builds the engine and prints one
//! JSON document per invocation on stdout.

use anyhow::{Context, Result};
use champwiki_core::Config;
use clap::Parser;

mod cli;
mod commands;
mod logging;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize_logging(&cli)?;

    let config = load_config(&cli)?;
    let output = match &cli.command {
        Commands::Get(args) => commands::get(config, args).await?,
        Commands::Cache { command } => commands::cache(config, command)?,
    };

    let rendered = if cli.compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{rendered}");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => {
            let mut config = Config::from_path(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            config.apply_env_overrides()?;
            Ok(config)
        },
        None => Ok(Config::load()?),
    }
}
