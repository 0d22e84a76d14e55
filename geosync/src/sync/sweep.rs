//! Removal of orphaned work directories.
//!
//! Work directories left behind by interrupted or failed sync attempts are
//! reclaimed here. Sweeping is best-effort: individual failures are logged
//! and counted but never abort the sweep or propagate to the caller.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use super::storage::{is_work_directory_name, StorageRoot};

/// Outcome of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Work directories removed completely.
    pub directories_removed: usize,
    /// Files and directories that could not be removed.
    pub failures: usize,
}

impl SweepReport {
    /// Returns true if every matching directory was removed.
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "removed {} work directories, {} failures",
            self.directories_removed, self.failures
        )
    }
}

/// Removes `tmp-dl-*` directories directly under a storage root.
#[derive(Debug, Clone)]
pub struct RecoverySweeper {
    root: StorageRoot,
}

impl RecoverySweeper {
    /// Create a sweeper for the given root.
    pub fn new(root: StorageRoot) -> Self {
        Self { root }
    }

    /// Remove every work directory under the root.
    pub fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let entries = match fs::read_dir(self.root.path()) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.root.path().display(), error = %e, "cannot list storage root");
                report.failures += 1;
                return report;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_work_directory_name(name) {
                continue;
            }

            let path = entry.path();
            // Only directories are reclaimed; a stray file with the prefix is left alone.
            match fs::symlink_metadata(&path) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot stat work directory");
                    report.failures += 1;
                    continue;
                }
            }

            let failures = remove_tree(&path);
            if failures == 0 {
                debug!(path = %path.display(), "removed work directory");
                report.directories_removed += 1;
            } else {
                report.failures += failures;
            }
        }

        report
    }
}

/// Depth-first removal of `dir`. Returns the number of entries that failed.
fn remove_tree(dir: &Path) -> usize {
    let mut failures = 0;

    match fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                let is_dir = fs::symlink_metadata(&path)
                    .map(|m| m.is_dir())
                    .unwrap_or(false);

                if is_dir {
                    failures += remove_tree(&path);
                } else if let Err(e) = fs::remove_file(&path) {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!(path = %path.display(), error = %e, "cannot remove file");
                        failures += 1;
                    }
                }
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "cannot list directory");
            failures += 1;
        }
    }

    if let Err(e) = fs::remove_dir(dir) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %dir.display(), error = %e, "cannot remove directory");
            failures += 1;
        }
    }

    failures
}
