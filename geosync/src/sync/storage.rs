//! The managed storage root and the well-known names inside it.
//!
//! This module is the single source of truth for on-disk naming:
//! - the checksum record (`local.md5`)
//! - the managed database (`library.mmdb`)
//! - per-attempt work directories (`tmp-dl-<secs>-<n>`)

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;

use super::error::{SyncError, SyncResult};

/// File name of the persisted checksum record.
pub const CHECKSUM_FILE_NAME: &str = "local.md5";

/// File name of the managed database.
pub const LIBRARY_FILE_NAME: &str = "library.mmdb";

/// Extension of database files inside the publisher's archive.
pub const LIBRARY_EXTENSION: &str = "mmdb";

/// Prefix shared by all work directories.
pub const WORK_DIR_PREFIX: &str = "tmp-dl-";

/// Name of the archive inside a work directory.
pub const ARCHIVE_FILE_NAME: &str = "tmp.tar.gz";

/// Exclusive upper bound of the random work directory suffix.
const WORK_DIR_RANDOM_BOUND: u32 = 100_000;

/// How often to retry when a freshly generated work directory name is taken.
const WORK_DIR_ATTEMPTS: usize = 8;

/// A validated, writable directory managed exclusively by the sync engine.
///
/// The path is canonicalized once at construction and never re-derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoot {
    path: PathBuf,
}

impl StorageRoot {
    /// Validate `path` and resolve it to an absolute directory.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidConfiguration` if the path is empty, does
    /// not exist, is not a directory or is not writable.
    pub fn new(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(SyncError::InvalidConfiguration(
                "the storage directory is empty".to_string(),
            ));
        }
        if !path.exists() {
            return Err(SyncError::InvalidConfiguration(format!(
                "the storage directory {} does not exist",
                path.display()
            )));
        }
        if !path.is_dir() {
            return Err(SyncError::InvalidConfiguration(format!(
                "the storage directory {} is not a directory",
                path.display()
            )));
        }

        let path = fs::canonicalize(path).map_err(|e| {
            SyncError::InvalidConfiguration(format!(
                "the storage directory {} cannot be resolved: {}",
                path.display(),
                e
            ))
        })?;

        if let Err(e) = probe_writable(&path) {
            return Err(SyncError::InvalidConfiguration(format!(
                "the storage directory {} is not writable: {}",
                path.display(),
                e
            )));
        }

        Ok(Self { path })
    }

    /// The canonical root path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<root>/local.md5`
    pub fn checksum_file_path(&self) -> PathBuf {
        self.path.join(CHECKSUM_FILE_NAME)
    }

    /// `<root>/library.mmdb`
    pub fn library_file_path(&self) -> PathBuf {
        self.path.join(LIBRARY_FILE_NAME)
    }

    /// A fresh `<root>/tmp-dl-<unix-seconds>-<random>` path.
    ///
    /// Only derives the name; nothing is created.
    pub fn new_work_directory_path(&self) -> PathBuf {
        let secs = Utc::now().timestamp();
        let n = rand::rng().random_range(0..WORK_DIR_RANDOM_BOUND);
        self.path.join(work_directory_name(secs, n))
    }

    /// Create a new, empty work directory.
    ///
    /// Retries with a new name when the generated one is already taken.
    pub fn create_work_directory(&self) -> io::Result<PathBuf> {
        let mut last_err = None;
        for _ in 0..WORK_DIR_ATTEMPTS {
            let candidate = self.new_work_directory_path();
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AlreadyExists, "no free work directory name")
        }))
    }
}

/// Name of a work directory created at `secs` with random suffix `n`.
pub fn work_directory_name(secs: i64, n: u32) -> String {
    format!("{}{}-{}", WORK_DIR_PREFIX, secs, n)
}

/// Returns true if `name` follows the work directory naming pattern.
pub fn is_work_directory_name(name: &str) -> bool {
    name.starts_with(WORK_DIR_PREFIX)
}

fn probe_writable(dir: &Path) -> io::Result<()> {
    let n: u32 = rand::rng().random();
    let probe = dir.join(format!(".geosync-probe-{}", n));
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)?;
    fs::remove_file(&probe)
}
