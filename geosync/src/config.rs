//! INI configuration file.
//!
//! ```ini
//! [publisher]
//! license_key = YOUR_KEY
//! library_url = https://...{{licenseKey}}...
//! library_md5_url = https://...{{licenseKey}}...
//!
//! [storage]
//! directory = /var/lib/geosync
//!
//! [lookup]
//! cache_ttl_secs = 43200
//!
//! [logging]
//! level = info
//! directory = /var/log/geosync
//! ```
//!
//! Every section and key is optional. Unknown sections and keys are rejected
//! when the file is loaded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::lookup::{LookupConfig, DEFAULT_CACHE_TTL};
use crate::sync::{SyncConfig, SyncError, UrlTemplates};

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read or parsed.
    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    /// A section name is not recognized.
    #[error("unknown config section [{0}]")]
    UnknownSection(String),

    /// A key is not recognized in its section.
    #[error("unknown config key {key} in [{section}]")]
    UnknownKey { section: String, key: String },

    /// A value could not be parsed.
    #[error("invalid value for {key} in [{section}]: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        reason: String,
    },
}

/// `[publisher]` settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublisherSettings {
    pub license_key: Option<String>,
    pub urls: UrlTemplates,
}

/// `[storage]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub directory: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            directory: default_storage_dir(),
        }
    }
}

/// `[lookup]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSettings {
    pub cache_ttl: Duration,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// `[logging]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Also write logs to `<directory>/geosync.log`.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// The parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub publisher: PublisherSettings,
    pub storage: StorageSettings,
    pub lookup: LookupSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location, falling back to defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        match config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Load {
            path: PathBuf::from("<string>"),
            source: ini::Error::Parse(e),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (section, properties) in ini.iter() {
            let Some(section) = section else {
                if let Some((key, _)) = properties.iter().next() {
                    return Err(ConfigError::UnknownKey {
                        section: String::new(),
                        key: key.to_string(),
                    });
                }
                continue;
            };

            for (key, value) in properties.iter() {
                config.apply(section, key, value.trim())?;
            }
        }

        Ok(config)
    }

    fn apply(&mut self, section: &str, key: &str, value: &str) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey {
            section: section.to_string(),
            key: key.to_string(),
        };

        match section {
            "publisher" => match key {
                "license_key" => {
                    self.publisher.license_key = (!value.is_empty()).then(|| value.to_string())
                }
                _ => {
                    self.publisher.urls.set(key, value).map_err(|_| unknown())?;
                }
            },
            "storage" => match key {
                "directory" => self.storage.directory = expand_home(value),
                _ => return Err(unknown()),
            },
            "lookup" => match key {
                "cache_ttl_secs" => {
                    let secs = value.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                        section: section.to_string(),
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?;
                    self.lookup.cache_ttl = Duration::from_secs(secs);
                }
                _ => return Err(unknown()),
            },
            "logging" => match key {
                "level" => self.logging.level = value.to_string(),
                "directory" => self.logging.directory = Some(expand_home(value)),
                _ => return Err(unknown()),
            },
            other => return Err(ConfigError::UnknownSection(other.to_string())),
        }
        Ok(())
    }

    /// Build the sync engine configuration.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidConfiguration` when no license key is set.
    pub fn to_sync_config(&self) -> Result<SyncConfig, SyncError> {
        let license_key = self.publisher.license_key.clone().ok_or_else(|| {
            SyncError::InvalidConfiguration(
                "no license key configured; set license_key in [publisher]".to_string(),
            )
        })?;

        Ok(SyncConfig::new(license_key, self.storage.directory.clone())
            .with_urls(self.publisher.urls.clone()))
    }

    /// Build the reader configuration.
    pub fn to_lookup_config(&self) -> LookupConfig {
        LookupConfig {
            cache_ttl: self.lookup.cache_ttl,
        }
    }
}

/// Default config file location: `<config dir>/geosync/config.ini`.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("geosync").join("config.ini"))
}

/// Default storage directory: `<data dir>/geosync`.
pub fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("geosync"))
        .unwrap_or_else(|| PathBuf::from("geosync-data"))
}

fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}
