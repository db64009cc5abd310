//! Command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use console::style;

/// Closed-loop agent orchestration under PID control.
#[derive(Parser, Debug)]
#[command(name = "cogpid", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop toward a project goal
    Run(commands::run::RunArgs),
    /// Inspect or validate configuration
    Config(commands::config::ConfigArgs),
}

/// Print an error and exit non-zero.
pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {err:#}", style("error:").red().bold());
    std::process::exit(1);
}
