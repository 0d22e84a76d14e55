//! Cached address lookups against the managed library.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::cache::LookupCache;
use super::client_ip::client_ip;
use super::error::LookupError;

/// Prefix of every cache key written by the reader.
pub const CACHE_KEY_PREFIX: &str = "geoip-lookup-";

/// Default lifetime of cached lookups.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 12);

/// The binary database reader.
///
/// Implementations resolve an address to its record, `None` when the
/// address is not in the database.
pub trait RecordSource: Send + Sync {
    fn lookup(&self, ip: IpAddr) -> Result<Option<Value>, LookupError>;
}

impl<T: RecordSource + ?Sized> RecordSource for Arc<T> {
    fn lookup(&self, ip: IpAddr) -> Result<Option<Value>, LookupError> {
        (**self).lookup(ip)
    }
}

/// Reader configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    /// How long cached lookups stay valid.
    pub cache_ttl: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl LookupConfig {
    /// Override a setting by key name.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::InvalidConfiguration` for unknown keys.
    pub fn set(&mut self, key: &str, value: Duration) -> Result<&mut Self, LookupError> {
        match key {
            "cache_ttl" | "cacheTtl" => self.cache_ttl = value,
            other => {
                return Err(LookupError::InvalidConfiguration(format!(
                    "the config key {} is not valid",
                    other
                )))
            }
        }
        Ok(self)
    }
}

/// Latitude and longitude of an address.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Resolves addresses through a `RecordSource`, memoizing in an optional cache.
pub struct GeoReader<S> {
    source: S,
    cache: Option<Arc<dyn LookupCache>>,
    config: LookupConfig,
}

impl<S: RecordSource> GeoReader<S> {
    /// Create a reader without a cache.
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: None,
            config: LookupConfig::default(),
        }
    }

    /// Memoize lookups in `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn LookupCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the reader configuration.
    pub fn with_config(mut self, config: LookupConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Everything the database knows about `ip`.
    ///
    /// Cache failures are logged and the database is queried directly.
    pub fn information(&self, ip: &str) -> Result<Option<Value>, LookupError> {
        let addr: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| LookupError::InvalidAddress(ip.to_string()))?;
        let key = cache_key(&addr);

        if let Some(cache) = &self.cache {
            match cache.get(&key) {
                Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                    Ok(value) => {
                        debug!(%addr, "lookup served from cache");
                        return Ok(Some(value));
                    }
                    Err(e) => warn!(%addr, error = %e, "discarding undecodable cache entry"),
                },
                Ok(None) => {}
                Err(e) => warn!(%addr, error = %e, "cache read failed"),
            }
        }

        let record = match self.source.lookup(addr)? {
            Some(record) if !is_empty_record(&record) => record,
            _ => return Ok(None),
        };

        if let Some(cache) = &self.cache {
            let bytes = serde_json::to_vec(&record)?;
            if let Err(e) = cache.set(&key, bytes, self.config.cache_ttl) {
                warn!(%addr, error = %e, "cache write failed");
            }
        }

        Ok(Some(record))
    }

    /// Only the coordinates of `ip`.
    pub fn location(&self, ip: &str) -> Result<Option<Coordinates>, LookupError> {
        Ok(self
            .information(ip)?
            .as_ref()
            .and_then(coordinates_of))
    }

    /// Information about the client that sent a request.
    ///
    /// Returns `None` when no client address can be determined.
    pub fn information_for_request(
        &self,
        headers: &HeaderMap,
        remote_addr: Option<IpAddr>,
    ) -> Result<Option<Value>, LookupError> {
        match client_ip(headers, remote_addr) {
            Some(ip) => self.information(&ip),
            None => Ok(None),
        }
    }
}

/// `geoip-lookup-<sha256 of the address>`
fn cache_key(addr: &IpAddr) -> String {
    let digest = Sha256::digest(addr.to_string().as_bytes());
    format!("{}{:x}", CACHE_KEY_PREFIX, digest)
}

fn is_empty_record(record: &Value) -> bool {
    match record {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn coordinates_of(record: &Value) -> Option<Coordinates> {
    let location = record.get("location")?;
    Some(Coordinates {
        latitude: location.get("latitude")?.as_f64()?,
        longitude: location.get("longitude")?.as_f64()?,
    })
}
