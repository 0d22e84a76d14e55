//! Configuration CLI commands.
//!
//! Provides `config show` and `config path`.

use clap::Subcommand;
use geosync::config::{config_file_path, ConfigFile};

use super::common::{mask_secret, Overrides};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (license key masked)
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, overrides: &Overrides) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_show(overrides),
        ConfigCommands::Path => run_path(overrides),
    }
}

fn run_show(overrides: &Overrides) -> Result<(), CliError> {
    let config = overrides.load_config()?;
    print!("{}", render(&config));
    Ok(())
}

fn run_path(overrides: &Overrides) -> Result<(), CliError> {
    let path = overrides.config.clone().or_else(config_file_path).ok_or_else(|| {
        CliError::Config("Could not determine the configuration directory".to_string())
    })?;
    println!("{}", path.display());
    Ok(())
}

fn render(config: &ConfigFile) -> String {
    let license_key = config
        .publisher
        .license_key
        .as_deref()
        .map(mask_secret)
        .unwrap_or_else(|| "(not set)".to_string());
    let log_dir = config
        .logging
        .directory
        .as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string());

    let mut out = String::new();
    out.push_str("[publisher]\n");
    out.push_str(&format!("  license_key = {}\n", license_key));
    out.push_str(&format!("  library_url = {}\n", config.publisher.urls.library_url));
    out.push_str(&format!(
        "  library_md5_url = {}\n",
        config.publisher.urls.library_md5_url
    ));
    out.push_str("\n[storage]\n");
    out.push_str(&format!("  directory = {}\n", config.storage.directory.display()));
    out.push_str("\n[lookup]\n");
    out.push_str(&format!(
        "  cache_ttl_secs = {}\n",
        config.lookup.cache_ttl.as_secs()
    ));
    out.push_str("\n[logging]\n");
    out.push_str(&format!("  level = {}\n", config.logging.level));
    out.push_str(&format!("  directory = {}\n", log_dir));
    out
}
