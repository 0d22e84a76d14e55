//! Local and remote checksums of the managed library.
//!
//! A checksum is an opaque byte string published next to the archive. The
//! oracle reads the locally persisted copy and fetches the remote one,
//! memoizing each for the lifetime of the oracle. File existence is never
//! memoized so on-disk changes are always observed.

use std::fmt;
use std::fs;
use std::sync::Arc;

use tracing::debug;

use super::config::{redact, render_url_now, SyncConfig};
use super::error::{SyncError, SyncResult};
use super::http::{HttpClient, RequestOptions};
use super::stage::SyncStage;
use super::storage::StorageRoot;

/// An opaque checksum, compared byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum(Vec<u8>);

impl Checksum {
    /// Wrap raw checksum bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if the checksum has no content.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Checksum {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Source of the local and foreign checksums.
pub struct ChecksumOracle {
    root: StorageRoot,
    http: Arc<dyn HttpClient>,
    license_key: String,
    md5_url_template: String,
    options: RequestOptions,
    local: Option<Checksum>,
    foreign: Option<Checksum>,
}

impl ChecksumOracle {
    /// Create an oracle for `root` using the checksum URL from `config`.
    pub fn new(root: StorageRoot, http: Arc<dyn HttpClient>, config: &SyncConfig) -> Self {
        Self {
            root,
            http,
            license_key: config.license_key.clone(),
            md5_url_template: config.urls.library_md5_url.clone(),
            options: RequestOptions::with_timeout(config.checksum_timeout),
            local: None,
            foreign: None,
        }
    }

    /// Returns true if both the checksum file and the library exist.
    pub fn has_local_file(&self) -> bool {
        self.root.checksum_file_path().exists() && self.root.library_file_path().exists()
    }

    /// The persisted checksum, or `None` when there is no local copy.
    pub fn local_checksum(&mut self) -> SyncResult<Option<Checksum>> {
        if let Some(cached) = &self.local {
            return Ok(Some(cached.clone()));
        }
        if !self.has_local_file() {
            return Ok(None);
        }

        let path = self.root.checksum_file_path();
        let bytes = fs::read(&path).map_err(|e| {
            SyncError::download_caused(
                SyncStage::ReadingLocalChecksum,
                format!("could not read {}", path.display()),
                e,
            )
        })?;

        let checksum = Checksum::new(bytes);
        self.local = Some(checksum.clone());
        Ok(Some(checksum))
    }

    /// The publisher's current checksum.
    ///
    /// Fetched at most once per oracle.
    pub fn foreign_checksum(&mut self) -> SyncResult<Checksum> {
        if let Some(cached) = &self.foreign {
            return Ok(cached.clone());
        }

        let url = render_url_now(&self.md5_url_template, &self.license_key);
        debug!(url = %redact(&url, &self.license_key), "fetching remote checksum");

        let body = self.http.get(&url, &self.options).map_err(|e| {
            SyncError::download_caused(
                SyncStage::FetchingChecksum,
                "could not download the library's checksum",
                e.redact(&self.license_key),
            )
        })?;

        let checksum = Checksum::new(body);
        self.foreign = Some(checksum.clone());
        Ok(checksum)
    }

    /// Forget the memoized local checksum.
    pub fn invalidate_local(&mut self) {
        self.local = None;
    }

    /// Forget the memoized remote checksum.
    pub fn invalidate_foreign(&mut self) {
        self.foreign = None;
    }
}

impl fmt::Debug for ChecksumOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChecksumOracle")
            .field("root", &self.root)
            .field("local", &self.local)
            .field("foreign", &self.foreign)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::http::tests::MockHttpClient;
    use tempfile::TempDir;

    const MD5_URL: &str = "https://example.com/db.md5?key={{licenseKey}}";
    const RENDERED_MD5_URL: &str = "https://example.com/db.md5?key=KEY";

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
    fn test_has_local_file_requires_both_files() {
        let (_temp, root, _http, oracle) = setup();
        assert!(!oracle.has_local_file());

        fs::write(root.checksum_file_path(), "abc").unwrap();
        assert!(!oracle.has_local_file());

        fs::write(root.library_file_path(), "db").unwrap();
        assert!(oracle.has_local_file());

        fs::remove_file(root.checksum_file_path()).unwrap();
        assert!(!oracle.has_local_file());
    }

    #[test]
    fn test_local_checksum_absent() {
        let (_temp, _root, _http, mut oracle) = setup();
        assert_eq!(oracle.local_checksum().unwrap(), None);
    }

    #[test]
    fn test_local_checksum_is_memoized() {
        let (_temp, root, _http, mut oracle) = setup();
        fs::write(root.checksum_file_path(), "abc\n").unwrap();
        fs::write(root.library_file_path(), "db").unwrap();

        assert_eq!(oracle.local_checksum().unwrap(), Some(Checksum::from("abc\n")));

        fs::write(root.checksum_file_path(), "changed").unwrap();
        assert_eq!(oracle.local_checksum().unwrap(), Some(Checksum::from("abc\n")));

        oracle.invalidate_local();
        assert_eq!(oracle.local_checksum().unwrap(), Some(Checksum::from("changed")));
    }

    #[test]
    fn test_absent_local_checksum_is_not_memoized() {
        let (_temp, root, _http, mut oracle) = setup();
        assert_eq!(oracle.local_checksum().unwrap(), None);

        fs::write(root.checksum_file_path(), "abc").unwrap();
        fs::write(root.library_file_path(), "db").unwrap();
        assert_eq!(oracle.local_checksum().unwrap(), Some(Checksum::from("abc")));
    }

    #[test]
    fn test_foreign_checksum_fetched_once() {
        let (_temp, _root, http, mut oracle) = setup();
        http.respond(RENDERED_MD5_URL, "abc123");

        assert_eq!(oracle.foreign_checksum().unwrap(), Checksum::from("abc123"));
        assert_eq!(oracle.foreign_checksum().unwrap(), Checksum::from("abc123"));
        assert_eq!(http.request_count(RENDERED_MD5_URL), 1);
    }

    #[test]
    fn test_foreign_checksum_is_verbatim() {
        let (_temp, _root, http, mut oracle) = setup();
        http.respond(RENDERED_MD5_URL, "  abc123\n");

        assert_eq!(oracle.foreign_checksum().unwrap().as_bytes(), b"  abc123\n");
    }

    #[test]
    fn test_foreign_checksum_failure() {
        let (_temp, _root, http, mut oracle) = setup();
        http.fail(RENDERED_MD5_URL, 401);

        let err = oracle.foreign_checksum().unwrap_err();
        assert!(err.is_download_failed());
        assert_eq!(err.stage(), Some(SyncStage::FetchingChecksum));

        // Failures are not memoized.
        http.respond(RENDERED_MD5_URL, "abc");
        assert_eq!(oracle.foreign_checksum().unwrap(), Checksum::from("abc"));
    }

    #[test]
    fn test_foreign_checksum_failure_hides_license_key() {
        let temp = TempDir::new().unwrap();
        let root = StorageRoot::new(temp.path()).unwrap();
        let http = Arc::new(MockHttpClient::new());
        let config = SyncConfig::new("SECRETKEY", temp.path())
            .with_url("library_md5_url", MD5_URL)
            .unwrap();
        let mut oracle = ChecksumOracle::new(root, http.clone(), &config);
        http.fail("https://example.com/db.md5?key=SECRETKEY", 403);

        let err = oracle.foreign_checksum().unwrap_err();

        let mut chain = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            chain.push_str(&format!(": {}", cause));
            source = cause.source();
        }
        assert!(chain.contains("status 403"));
        assert!(chain.contains("key=***"));
        assert!(!chain.contains("SECRETKEY"));
    }

    #[test]
    fn test_checksum_display() {
        assert_eq!(Checksum::from("d41d8cd9").to_string(), "d41d8cd9");
        assert!(Checksum::new(Vec::new()).is_empty());
    }
}
