//! The sync engine: download, extract and replace the managed library.
//!
//! A sync cycle walks through these stages:
//! 1. Sweep leftover work directories
//! 2. Fetch the publisher's checksum (memoized)
//! 3. Create a fresh work directory
//! 4. Download the archive into it
//! 5. Extract the archive
//! 6. Locate the database file (`<work>/*/*.mmdb`)
//! 7. Rename it over `library.mmdb`
//! 8. Persist the checksum and drop the memoized local value
//! 9. Sweep again
//!
//! Any failure aborts the cycle with `SyncError::DownloadFailed`. The
//! committed library and checksum are only ever replaced by rename, so a
//! failed cycle leaves them untouched. Its work directory stays behind until
//! the next sweep.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::checksum::{Checksum, ChecksumOracle};
use super::config::{redact, render_url_now, SyncConfig};
use super::detector::ChangeDetector;
use super::error::{SyncError, SyncResult};
use super::extractor::{ArchiveExtractor, TarGzExtractor};
use super::http::{HttpClient, ReqwestHttpClient, RequestOptions};
use super::stage::{SyncProgressCallback, SyncStage};
use super::storage::{
    StorageRoot, ARCHIVE_FILE_NAME, CHECKSUM_FILE_NAME, LIBRARY_EXTENSION,
};
use super::sweep::{RecoverySweeper, SweepReport};

/// Keeps `library.mmdb` in a storage root in sync with the publisher.
pub struct SyncEngine {
    root: StorageRoot,
    config: SyncConfig,
    http: Arc<dyn HttpClient>,
    extractor: Arc<dyn ArchiveExtractor>,
    oracle: ChecksumOracle,
    sweeper: RecoverySweeper,
    on_progress: Option<SyncProgressCallback>,
}

impl SyncEngine {
    /// Create an engine using the reqwest client and the tar.gz extractor.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidConfiguration` if the storage directory is
    /// unusable or the HTTP client cannot be created.
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        let http = ReqwestHttpClient::new()
            .map_err(|e| SyncError::InvalidConfiguration(e.to_string()))?;
        Self::with_collaborators(config, Arc::new(http), Arc::new(TarGzExtractor::new()))
    }

    /// Create an engine with explicit HTTP and extraction collaborators.
    pub fn with_collaborators(
        config: SyncConfig,
        http: Arc<dyn HttpClient>,
        extractor: Arc<dyn ArchiveExtractor>,
    ) -> SyncResult<Self> {
        let root = StorageRoot::new(&config.storage_dir)?;
        let oracle = ChecksumOracle::new(root.clone(), Arc::clone(&http), &config);
        let sweeper = RecoverySweeper::new(root.clone());

        Ok(Self {
            root,
            config,
            http,
            extractor,
            oracle,
            sweeper,
            on_progress: None,
        })
    }

    /// Report each stage change to `callback`.
    pub fn with_progress(mut self, callback: SyncProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// The storage root this engine manages.
    pub fn storage_root(&self) -> &StorageRoot {
        &self.root
    }

    /// Path of the managed library, for the read path.
    pub fn library_file_path(&self) -> PathBuf {
        self.root.library_file_path()
    }

    /// Returns true if both the library and its checksum exist.
    pub fn has_local_file(&self) -> bool {
        self.oracle.has_local_file()
    }

    /// The persisted checksum, if there is a local copy.
    pub fn local_checksum(&mut self) -> SyncResult<Option<Checksum>> {
        self.oracle.local_checksum()
    }

    /// The publisher's checksum.
    pub fn foreign_checksum(&mut self) -> SyncResult<Checksum> {
        self.oracle.foreign_checksum()
    }

    /// Forget the memoized remote checksum so the next check asks again.
    ///
    /// Long-lived callers polling for updates need this between checks.
    pub fn refresh_remote(&mut self) {
        self.oracle.invalidate_foreign();
    }

    /// Returns true if the local copy is missing or outdated.
    pub fn is_download_required(&mut self) -> SyncResult<bool> {
        ChangeDetector::new(&mut self.oracle).is_download_required()
    }

    /// Sync only when required. Returns true if a sync was performed.
    pub fn sync_if_required(&mut self) -> SyncResult<bool> {
        if !self.is_download_required()? {
            info!(root = %self.root.path().display(), "library is up to date");
            return Ok(false);
        }
        self.run()?;
        Ok(true)
    }

    /// Remove leftover work directories.
    pub fn sweep(&self) -> SweepReport {
        let report = self.sweeper.sweep();
        if report.is_clean() {
            debug!(%report, "sweep finished");
        } else {
            warn!(%report, "sweep left entries behind");
        }
        report
    }

    /// Download the library unconditionally and replace the local copy.
    ///
    /// Returns the path of the replaced library.
    pub fn run(&mut self) -> SyncResult<PathBuf> {
        info!(root = %self.root.path().display(), "starting library sync");

        self.enter(SyncStage::Sweeping);
        self.sweep();

        self.enter(SyncStage::FetchingChecksum);
        let checksum = self.oracle.foreign_checksum()?;
        if checksum.is_empty() {
            return Err(SyncError::download(
                SyncStage::FetchingChecksum,
                "the remote checksum is empty",
            ));
        }

        self.enter(SyncStage::PreparingWorkDir);
        let work_dir = self.root.create_work_directory().map_err(|e| {
            SyncError::download_caused(
                SyncStage::PreparingWorkDir,
                format!(
                    "the work directory under {} could not be created",
                    self.root.path().display()
                ),
                e,
            )
        })?;
        debug!(work_dir = %work_dir.display(), "created work directory");

        self.enter(SyncStage::Downloading);
        let archive = work_dir.join(ARCHIVE_FILE_NAME);
        self.download_archive(&archive)?;

        self.enter(SyncStage::Extracting);
        let files = self.extractor.extract(&archive, &work_dir).map_err(|e| {
            SyncError::download_caused(
                SyncStage::Extracting,
                format!("could not extract {}", archive.display()),
                e,
            )
        })?;
        debug!(files, "extracted archive");

        self.enter(SyncStage::Locating);
        let source = locate_library(&work_dir)?;

        self.enter(SyncStage::Replacing);
        replace_library(&source, &self.root.library_file_path())?;

        self.enter(SyncStage::Persisting);
        persist_checksum(&work_dir, &self.root.checksum_file_path(), &checksum)?;
        self.oracle.invalidate_local();

        self.enter(SyncStage::Sweeping);
        self.sweep();

        self.enter(SyncStage::Complete);
        let library = self.root.library_file_path();
        info!(library = %library.display(), %checksum, "library sync complete");
        Ok(library)
    }

    fn download_archive(&self, archive: &Path) -> SyncResult<()> {
        let url = render_url_now(&self.config.urls.library_url, &self.config.license_key);
        let options = RequestOptions::with_timeout(self.config.download_timeout);
        debug!(url = %redact(&url, &self.config.license_key), "downloading library archive");

        let bytes = self
            .http
            .download_to_file(&url, &options, archive)
            .map_err(|e| {
                SyncError::download_caused(
                    SyncStage::Downloading,
                    "could not download the library file",
                    e.redact(&self.config.license_key),
                )
            })?;
        info!(bytes, "downloaded library archive");
        Ok(())
    }

    fn enter(&self, stage: SyncStage) {
        info!(%stage, "entering sync stage");
        if let Some(ref cb) = self.on_progress {
            cb(stage);
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("root", &self.root)
            .field("oracle", &self.oracle)
            .finish_non_exhaustive()
    }
}

/// Find the single `<work>/*/*.mmdb` file.
///
/// More than one candidate is an error rather than an arbitrary pick.
fn locate_library(work_dir: &Path) -> SyncResult<PathBuf> {
    let read_failed = |dir: &Path, e: io::Error| {
        SyncError::download_caused(
            SyncStage::Locating,
            format!("could not list {}", dir.display()),
            e,
        )
    };

    // file_type() does not follow symlinks: only real directories holding
    // regular files qualify.
    let mut candidates = Vec::new();
    for entry in fs::read_dir(work_dir).map_err(|e| read_failed(work_dir, e))? {
        let entry = entry.map_err(|e| read_failed(work_dir, e))?;
        let dir = entry.path();
        if !entry.file_type().map_err(|e| read_failed(&dir, e))?.is_dir() {
            continue;
        }
        for inner in fs::read_dir(&dir).map_err(|e| read_failed(&dir, e))? {
            let inner = inner.map_err(|e| read_failed(&dir, e))?;
            let path = inner.path();
            let is_file = inner.file_type().map_err(|e| read_failed(&path, e))?.is_file();
            let is_library = path.extension().is_some_and(|ext| ext == LIBRARY_EXTENSION);
            if is_file && is_library {
                candidates.push(path);
            }
        }
    }

    match candidates.len() {
        0 => Err(SyncError::download(
            SyncStage::Locating,
            "could not find the extracted library file",
        )),
        1 => Ok(candidates.remove(0)),
        n => {
            candidates.sort();
            let names: Vec<String> = candidates
                .iter()
                .filter_map(|p| p.strip_prefix(work_dir).ok())
                .map(|p| p.display().to_string())
                .collect();
            Err(SyncError::download(
                SyncStage::Locating,
                format!("found {} candidate library files: {}", n, names.join(", ")),
            ))
        }
    }
}

/// Rename `source` over `target` once its contents are on disk.
fn replace_library(source: &Path, target: &Path) -> SyncResult<()> {
    File::open(source)
        .and_then(|f| f.sync_all())
        .map_err(|e| {
            SyncError::download_caused(
                SyncStage::Replacing,
                format!("could not flush {}", source.display()),
                e,
            )
        })?;

    fs::rename(source, target).map_err(|e| {
        SyncError::download_caused(
            SyncStage::Replacing,
            "error while moving the downloaded library into place",
            e,
        )
    })?;
    debug!(from = %source.display(), to = %target.display(), "replaced library");
    Ok(())
}

/// Write `checksum` next to the download, then rename it over `target`.
fn persist_checksum(work_dir: &Path, target: &Path, checksum: &Checksum) -> SyncResult<()> {
    let staged = work_dir.join(CHECKSUM_FILE_NAME);
    let write_failed = |e: io::Error| {
        SyncError::download_caused(
            SyncStage::Persisting,
            "could not write the local checksum file",
            e,
        )
    };

    let mut file = File::create(&staged).map_err(write_failed)?;
    file.write_all(checksum.as_bytes()).map_err(write_failed)?;
    file.sync_all().map_err(write_failed)?;
    drop(file);

    fs::rename(&staged, target).map_err(write_failed)
}
