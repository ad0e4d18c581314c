use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "arcadia",
    about = "Arcadia - game community bot",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, global = true, env = "ARCADIA_CONFIG", help = "Path to arcadia.json")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the bot services until Ctrl+C (default if no command specified)")]
    Run {
        #[arg(long, help = "Start the browser pool before serving")]
        warm_pool: bool,
    },

    #[command(about = "Check credentials and configuration values")]
    CheckConfig {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(subcommand, about = "Inspect stored bot data")]
    Data(DataCommands),
}

#[derive(Subcommand)]
pub enum DataCommands {
    #[command(about = "Show entry counts for every data file")]
    Stats {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },
}
