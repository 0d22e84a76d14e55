//! geosync CLI - Command-line interface
//!
//! Keeps a local GeoIP database in sync with its publisher.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use geosync::logging::{init_logging, LoggingOptions};
use tracing::debug;

use commands::common::Overrides;
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "geosync", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding the managed library
    #[arg(long, global = true, value_name = "DIR")]
    storage_dir: Option<PathBuf>,

    /// Publisher license key
    #[arg(long, global = true, env = "GEOSYNC_LICENSE_KEY", hide_env_values = true)]
    license_key: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the local library and whether a sync is required
    Status,

    /// Download the library if the publisher has a newer one
    Sync {
        /// Download even if the checksums match
        #[arg(long)]
        force: bool,
    },

    /// Remove leftover work directories
    Sweep,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let overrides = Overrides {
        config: cli.config,
        storage_dir: cli.storage_dir,
        license_key: cli.license_key,
    };

    // A broken config file still gets reported through logging.
    let logging = match overrides.load_config() {
        Ok(config) => LoggingOptions {
            level: config.logging.level,
            directory: config.logging.directory,
        },
        Err(_) => LoggingOptions::default(),
    };
    let logging = match cli.verbose {
        0 => logging,
        1 => logging.with_level("debug"),
        _ => logging.with_level("trace"),
    };
    let _guard = init_logging(&logging).map_err(CliError::Logging)?;
    debug!(command = ?cli.command, version = geosync::VERSION, "running command");

    match cli.command {
        Commands::Status => commands::status::run(&overrides),
        Commands::Sync { force } => commands::sync::run(&overrides, force),
        Commands::Sweep => commands::sweep::run(&overrides),
        Commands::Config { command } => commands::config::run(command, &overrides),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_force_with_globals() {
        let cli = Cli::try_parse_from([
            "geosync",
            "sync",
            "--force",
            "--storage-dir",
            "/srv/geoip",
            "-vv",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Sync { force: true }));
        assert_eq!(cli.storage_dir, Some(PathBuf::from("/srv/geoip")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_config_path() {
        let cli = Cli::try_parse_from(["geosync", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Path
            }
        ));
    }
}
