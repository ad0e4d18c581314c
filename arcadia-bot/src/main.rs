//! Arcadia bot daemon.
//!
//! Loads `arcadia.json` plus environment overrides, installs logging and runs the
//! selected command. With no subcommand the services run until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;

mod cli;
mod commands;
mod config_commands;
mod signals;

use arcadia_core::modules::{config::load_config, logger::init_logging};
use cli::{Cli, Commands, DataCommands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Run { warm_pool: false }) {
        Commands::Run { warm_pool } => {
            let _guards = init_logging(&config.log).context("Failed to initialize logging")?;
            commands::run(config, warm_pool).await
        },
        Commands::CheckConfig { json } => config_commands::check_config(&config, json),
        Commands::Data(DataCommands::Stats { json }) => commands::data_stats(config, json).await,
    }
}
