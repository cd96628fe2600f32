//! CLI module for Nixora
//!
//! Provides commands:
//! - `serve`: Run the builder backend (default)
//! - `catalog`: Print the component library
//! - `check-config`: Print the effective configuration

use clap::{Parser, Subcommand};
use nixora_canvas::ComponentLibrary;

/// Nixora page builder
#[derive(Parser, Debug)]
#[command(name = "nixora")]
#[command(about = "Page builder backend with live preview")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Print the component library as JSON
    Catalog,
    /// Load and print the effective configuration
    CheckConfig,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => crate::server::run().await,
        Commands::Catalog => {
            let library = ComponentLibrary::builtin();
            println!("{}", serde_json::to_string_pretty(library.definitions())?);
            Ok(())
        }
        Commands::CheckConfig => {
            let config = crate::server::load_config()?;
            config.validate()?;
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["nixora"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["nixora", "catalog"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Catalog));

        let cli = Cli::try_parse_from(["nixora", "check-config"]).unwrap();
        assert_eq!(cli.command, Some(Commands::CheckConfig));
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["nixora", "deploy"]).is_err());
    }
}
