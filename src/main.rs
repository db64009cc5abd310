//! Cogpid CLI entry point.

use clap::Parser;

use cogpid::cli::{handle_error, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => cogpid::cli::commands::run::execute(args).await,
        Commands::Config(args) => cogpid::cli::commands::config::execute(args).await,
    };

    if let Err(err) = result {
        handle_error(err);
    }
}
