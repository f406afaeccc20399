//! themesync CLI
//!
//! Command-line interface for themesync - pull and push storefront theme assets.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use themesync_core::Config;

mod commands;
mod logging;
mod output;
mod prompt;

use commands::sync::{Direction, SyncArgs};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "themesync")]
#[command(about = "Sync a local theme directory with a storefront theme")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download theme files from the store
    Pull(SyncArgs),
    /// Upload theme files to the store
    Push(SyncArgs),
    /// List themes on the store
    Themes,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (store, access_token, api_version, workers, ...)
        key: String,
        /// Configuration value ("none" clears optional keys)
        value: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    match run(cli, &output).await {
        Ok(code) => code,
        Err(e) => {
            output.error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, output: &Output) -> Result<ExitCode> {
    let config_path = cli.config.as_deref();

    // Config commands work without a store
    if let Commands::Config { command } = &cli.command {
        handle_config_command(command.clone(), config_path, output)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init(&config, cli.verbose);

    match cli.command {
        Commands::Pull(args) => commands::sync::run(Direction::Pull, args, &config, output).await,
        Commands::Push(args) => commands::sync::run(Direction::Push, args, &config, output).await,
        Commands::Themes => {
            commands::themes::list(&config, output).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { command } => {
            handle_config_command(command, config_path, output)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&Path>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}
