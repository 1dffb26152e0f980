mod cli;
mod cli_utils;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; command output stays on stdout
    scriptpack::logging::init(&cli.log_level);

    match cli.command {
        Commands::Restore(args) => commands::restore::run(args).await,
        Commands::Deps(args) => commands::deps::run(args).await,
        Commands::Resolve(args) => commands::resolve::run(args).await,
        Commands::Cache(args) => commands::cache::run(args).await,
    }
}
