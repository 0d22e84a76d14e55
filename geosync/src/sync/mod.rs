//! Synchronization of the local GeoIP library with its publisher.
//!
//! # Architecture
//!
//! ```text
//! SyncEngine
//!     │
//!     ├── ChangeDetector ──► ChecksumOracle ──► HttpClient (trait)
//!     │                           │
//!     │                           └── StorageRoot (local.md5, library.mmdb)
//!     │
//!     ├── HttpClient (trait)        ReqwestHttpClient
//!     ├── ArchiveExtractor (trait)  TarGzExtractor
//!     └── RecoverySweeper ──────► tmp-dl-* work directories
//! ```
//!
//! # Example
//!
//! ```ignore
//! use geosync::sync::{SyncConfig, SyncEngine};
//!
//! let config = SyncConfig::new(license_key, "/var/lib/geoip");
//! let mut engine = SyncEngine::new(config)?;
//!
//! if engine.sync_if_required()? {
//!     println!("updated {}", engine.library_file_path().display());
//! }
//! ```

mod checksum;
mod config;
mod detector;
mod engine;
mod error;
mod extractor;
mod http;
mod stage;
mod storage;
mod sweep;

pub use checksum::{Checksum, ChecksumOracle};
pub use config::{
    redact, render_url, render_url_now, SyncConfig, UrlTemplateKey, UrlTemplates,
    DEFAULT_LIBRARY_MD5_URL, DEFAULT_LIBRARY_URL,
};
pub use detector::ChangeDetector;
pub use engine::SyncEngine;
pub use error::{BoxError, SyncError, SyncResult};
pub use extractor::{ArchiveExtractor, TarGzExtractor};
pub use http::{HttpClient, ReqwestHttpClient, RequestOptions, TransportError};
pub use stage::{SyncProgressCallback, SyncStage};
pub use storage::{
    is_work_directory_name, work_directory_name, StorageRoot, CHECKSUM_FILE_NAME,
    LIBRARY_FILE_NAME,
};
pub use sweep::{RecoverySweeper, SweepReport};
