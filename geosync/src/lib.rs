//! geosync - keeps a local GeoIP database in step with its publisher
//!
//! The [`sync`] module downloads the publisher's compressed archive when its
//! checksum changes, extracts the binary database and atomically replaces the
//! managed copy. The [`lookup`] module answers address queries against that
//! copy through a TTL cache.
//!
//! Supporting modules:
//!
//! - [`config`]: INI configuration file
//! - [`logging`]: tracing subscriber setup

pub mod config;
pub mod logging;
pub mod lookup;
pub mod sync;

pub use config::{ConfigError, ConfigFile};
pub use lookup::{GeoReader, LookupError};
pub use sync::{SyncConfig, SyncEngine, SyncError, SyncResult};

/// Version reported in the HTTP user agent and by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
