//! Configuration for the sync engine.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, Utc};

use super::error::{SyncError, SyncResult};

/// Placeholder replaced by the account's license key.
pub const LICENSE_KEY_PLACEHOLDER: &str = "{{licenseKey}}";

/// Placeholder replaced by the current UTC date as `YYYYMMDD`.
pub const DATE_PLACEHOLDER: &str = "{{yyyymmdd}}";

/// Default archive URL (GeoLite2 City edition).
pub const DEFAULT_LIBRARY_URL: &str = "https://download.maxmind.com/app/geoip_download?edition_id=GeoLite2-City&license_key={{licenseKey}}&suffix=tar.gz";

/// Default checksum URL matching [`DEFAULT_LIBRARY_URL`].
pub const DEFAULT_LIBRARY_MD5_URL: &str = "https://download.maxmind.com/app/geoip_download?edition_id=GeoLite2-City&license_key={{licenseKey}}&suffix=tar.gz.md5";

/// Timeout for the checksum request.
pub const DEFAULT_CHECKSUM_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeout for the archive download.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(20);

/// Keys accepted by [`UrlTemplates::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlTemplateKey {
    LibraryUrl,
    LibraryMd5Url,
}

impl FromStr for UrlTemplateKey {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "library_url" | "libraryUrl" => Ok(Self::LibraryUrl),
            "library_md5_url" | "libraryMd5Url" => Ok(Self::LibraryMd5Url),
            other => Err(SyncError::InvalidConfiguration(format!(
                "the config key {} is not valid",
                other
            ))),
        }
    }
}

/// Remote URL templates for the archive and its checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplates {
    /// Where the database archive is downloaded from.
    pub library_url: String,
    /// Where the archive's checksum is published.
    pub library_md5_url: String,
}

impl Default for UrlTemplates {
    fn default() -> Self {
        Self {
            library_url: DEFAULT_LIBRARY_URL.to_string(),
            library_md5_url: DEFAULT_LIBRARY_MD5_URL.to_string(),
        }
    }
}

impl UrlTemplates {
    /// Override a template by key name.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidConfiguration` for unknown keys.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> SyncResult<&mut Self> {
        match key.parse::<UrlTemplateKey>()? {
            UrlTemplateKey::LibraryUrl => self.library_url = value.into(),
            UrlTemplateKey::LibraryMd5Url => self.library_md5_url = value.into(),
        }
        Ok(self)
    }
}

/// Substitute the placeholders of `template`.
pub fn render_url(template: &str, license_key: &str, date: NaiveDate) -> String {
    template
        .replace(DATE_PLACEHOLDER, &date.format("%Y%m%d").to_string())
        .replace(LICENSE_KEY_PLACEHOLDER, license_key)
}

/// Substitute the placeholders of `template` using today's UTC date.
pub fn render_url_now(template: &str, license_key: &str) -> String {
    render_url(template, license_key, Utc::now().date_naive())
}

/// Replace the license key in `url` so it can be logged.
pub fn redact(url: &str, license_key: &str) -> String {
    if license_key.is_empty() {
        url.to_string()
    } else {
        url.replace(license_key, "***")
    }
}

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// License key substituted into the URL templates.
    pub license_key: String,

    /// Directory holding the managed files.
    pub storage_dir: PathBuf,

    /// Remote URL templates.
    pub urls: UrlTemplates,

    /// Timeout for the checksum request.
    pub checksum_timeout: Duration,

    /// Timeout for the archive download.
    pub download_timeout: Duration,
}

impl SyncConfig {
    /// Create a configuration with default URLs and timeouts.
    pub fn new(license_key: impl Into<String>, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            license_key: license_key.into(),
            storage_dir: storage_dir.into(),
            urls: UrlTemplates::default(),
            checksum_timeout: DEFAULT_CHECKSUM_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    /// Set the URL templates.
    pub fn with_urls(mut self, urls: UrlTemplates) -> Self {
        self.urls = urls;
        self
    }

    /// Override a single URL template by key name.
    pub fn with_url(mut self, key: &str, value: impl Into<String>) -> SyncResult<Self> {
        self.urls.set(key, value)?;
        Ok(self)
    }

    /// Set the checksum request timeout.
    pub fn with_checksum_timeout(mut self, timeout: Duration) -> Self {
        self.checksum_timeout = timeout;
        self
    }

    /// Set the archive download timeout.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::new("KEY", "/var/lib/geoip");
        assert_eq!(config.urls, UrlTemplates::default());
        assert_eq!(config.checksum_timeout, Duration::from_secs(2));
        assert_eq!(config.download_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_builder_pattern() {
        let config = SyncConfig::new("KEY", "/data")
            .with_url("libraryUrl", "https://mirror.example.com/db.tar.gz")
            .unwrap()
            .with_checksum_timeout(Duration::from_secs(5))
            .with_download_timeout(Duration::from_secs(60));

        assert_eq!(config.urls.library_url, "https://mirror.example.com/db.tar.gz");
        assert_eq!(config.urls.library_md5_url, DEFAULT_LIBRARY_MD5_URL);
        assert_eq!(config.checksum_timeout, Duration::from_secs(5));
        assert_eq!(config.download_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_set_accepts_both_spellings() {
        let mut urls = UrlTemplates::default();
        urls.set("library_md5_url", "a").unwrap();
        assert_eq!(urls.library_md5_url, "a");
        urls.set("libraryMd5Url", "b").unwrap();
        assert_eq!(urls.library_md5_url, "b");
    }

    #[test]
    fn test_set_rejects_unknown_key() {
        let mut urls = UrlTemplates::default();
        let result = urls.set("libaryUrl", "x");
        assert!(matches!(result, Err(SyncError::InvalidConfiguration(_))));
        assert_eq!(urls, UrlTemplates::default());
    }

    #[test]
    fn test_render_url() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 5).unwrap();
        let url = render_url(
            "https://example.com/{{yyyymmdd}}/db?key={{licenseKey}}",
            "SECRET",
            date,
        );
        assert_eq!(url, "https://example.com/20230105/db?key=SECRET");
    }

    #[test]
    fn test_render_default_url() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let url = render_url(DEFAULT_LIBRARY_MD5_URL, "abc", date);
        assert!(url.contains("license_key=abc"));
        assert!(url.ends_with("suffix=tar.gz.md5"));
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("https://x/?k=SECRET", "SECRET"), "https://x/?k=***");
        assert_eq!(redact("https://x/", ""), "https://x/");
    }

    proptest! {
        #[test]
        fn prop_rendered_url_has_no_placeholders(key in "[A-Za-z0-9]{0,24}", day in 1u32..=28, month in 1u32..=12) {
            let date = NaiveDate::from_ymd_opt(2020, month, day).unwrap();
            let template = format!("{}/{}/{}", DATE_PLACEHOLDER, LICENSE_KEY_PLACEHOLDER, DATE_PLACEHOLDER);
            let url = render_url(&template, &key, date);
            prop_assert!(!url.contains("{{"));
            prop_assert!(url.contains(&key));
        }
    }
}
