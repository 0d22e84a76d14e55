//! Decides whether the local library is stale.

use tracing::debug;

use super::checksum::ChecksumOracle;
use super::error::SyncResult;

/// Compares the local copy against the publisher.
pub struct ChangeDetector<'a> {
    oracle: &'a mut ChecksumOracle,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(oracle: &'a mut ChecksumOracle) -> Self {
        Self { oracle }
    }

    /// Returns true if there is no local copy or the checksums differ.
    ///
    /// Errors from fetching the remote checksum propagate unchanged.
    pub fn is_download_required(&mut self) -> SyncResult<bool> {
        if !self.oracle.has_local_file() {
            debug!("no local library, download required");
            return Ok(true);
        }

        let local = self.oracle.local_checksum()?;
        let foreign = self.oracle.foreign_checksum()?;
        let required = local.as_ref() != Some(&foreign);
        debug!(required, "compared local and remote checksums");
        Ok(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::config::SyncConfig;
    use crate::sync::http::tests::MockHttpClient;
    use crate::sync::storage::StorageRoot;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    const MD5_URL: &str = "https://example.com/db.md5";

    fn setup() -> (TempDir, StorageRoot, Arc<MockHttpClient>, ChecksumOracle) {
        let temp = TempDir::new().unwrap();
        let root = StorageRoot::new(temp.path()).unwrap();
        let http = Arc::new(MockHttpClient::new());
        let config = SyncConfig::new("KEY", temp.path())
            .with_url("library_md5_url", MD5_URL)
            .unwrap();
        let oracle = ChecksumOracle::new(root.clone(), http.clone(), &config);
        (temp, root, http, oracle)
    }

    #[test]
    fn test_required_without_local_copy() {
        let (_temp, _root, http, mut oracle) = setup();
        // Unreachable publisher does not matter on first run.
        http.fail(MD5_URL, 503);

        assert!(ChangeDetector::new(&mut oracle).is_download_required().unwrap());
        assert_eq!(http.request_count(MD5_URL), 0);
    }

    #[test]
    fn test_not_required_when_checksums_match() {
        let (_temp, root, http, mut oracle) = setup();
        fs::write(root.checksum_file_path(), "abc123").unwrap();
        fs::write(root.library_file_path(), "db").unwrap();
        http.respond(MD5_URL, "abc123");

        let mut detector = ChangeDetector::new(&mut oracle);
        assert!(!detector.is_download_required().unwrap());
        assert!(!detector.is_download_required().unwrap());
        assert_eq!(http.request_count(MD5_URL), 1);
    }

    #[test]
    fn test_required_when_checksums_differ() {
        let (_temp, root, http, mut oracle) = setup();
        fs::write(root.checksum_file_path(), "abc123").unwrap();
        fs::write(root.library_file_path(), "db").unwrap();
        http.respond(MD5_URL, "abc123\n");

        assert!(ChangeDetector::new(&mut oracle).is_download_required().unwrap());
    }

    #[test]
    fn test_propagates_fetch_failure() {
        let (_temp, root, http, mut oracle) = setup();
        fs::write(root.checksum_file_path(), "abc123").unwrap();
        fs::write(root.library_file_path(), "db").unwrap();
        http.fail(MD5_URL, 500);

        let err = ChangeDetector::new(&mut oracle)
            .is_download_required()
            .unwrap_err();
        assert!(err.is_download_failed());
    }
}
