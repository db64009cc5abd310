//! `cogpid config` commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use console::style;

use crate::infrastructure::{ConfigLoader, DEFAULT_CONFIG_PATH};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,

    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the resolved configuration
    Show,
    /// Check that the configuration loads and validates
    Validate,
}

pub async fn execute(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = ConfigLoader::load(&args.config)?;
            let yaml =
                serde_yaml::to_string(&config).context("failed to serialize configuration")?;
            println!("{yaml}");
        }
        ConfigCommand::Validate => {
            ConfigLoader::load(&args.config)?;
            println!("{} {}", style("valid:").green().bold(), args.config);
        }
    }
    Ok(())
}
