//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;

use geosync::config::ConfigFile;
use geosync::SyncConfig;

use crate::error::CliError;

/// Settings that every command can override from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub storage_dir: Option<PathBuf>,
    pub license_key: Option<String>,
}

impl Overrides {
    /// Load the config file, honouring `--config`.
    pub fn load_config(&self) -> Result<ConfigFile, CliError> {
        let config = match &self.config {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };
        Ok(self.apply(config))
    }

    /// CLI values take precedence over the config file.
    pub fn apply(&self, mut config: ConfigFile) -> ConfigFile {
        if let Some(dir) = &self.storage_dir {
            config.storage.directory = dir.clone();
        }
        if let Some(key) = &self.license_key {
            config.publisher.license_key = Some(key.clone());
        }
        config
    }
}

/// Resolve the engine configuration, requiring a license key.
pub fn resolve_sync_config(config: &ConfigFile) -> Result<SyncConfig, CliError> {
    if config.publisher.license_key.is_none() {
        return Err(CliError::Config(
            "No license key configured. \
             Set license_key in [publisher], GEOSYNC_LICENSE_KEY or use --license-key"
                .to_string(),
        ));
    }
    Ok(config.to_sync_config()?)
}

/// Mask all but the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}
