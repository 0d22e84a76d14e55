//! Read path: resolve IP addresses against the synchronized library.
//!
//! The binary database format is not parsed here. A `RecordSource` opened on
//! `SyncEngine::library_file_path()` answers lookups, and `GeoReader` adds
//! client address resolution and optional memoization in a `LookupCache`.

mod cache;
mod client_ip;
mod error;
mod reader;

pub use cache::{LookupCache, MemoryLookupCache};
pub use client_ip::{client_ip, CLIENT_IP_HEADERS};
pub use error::LookupError;
pub use reader::{
    Coordinates, GeoReader, LookupConfig, RecordSource, CACHE_KEY_PREFIX, DEFAULT_CACHE_TTL,
};
