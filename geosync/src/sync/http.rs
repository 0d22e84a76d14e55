//! HTTP transport used to reach the publisher.
//!
//! The engine only needs two operations: fetch a small body into memory and
//! stream a larger body into a file. Both are behind [`HttpClient`] so tests
//! can substitute a mock.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use thiserror::Error;

use super::config::redact;

/// User agent sent with every request.
fn user_agent() -> String {
    format!("geosync/{}", crate::VERSION)
}

/// Errors raised by the HTTP transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or its body could not be read.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request did not finish within its timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server answered with a non-success status.
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// Writing the response body to disk failed.
    #[error("failed to write response to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Replace `license_key` in any URL the error carries.
    pub fn redact(self, license_key: &str) -> Self {
        match self {
            Self::Request { url, source } => Self::Request {
                url: redact(&url, license_key),
                source,
            },
            Self::Timeout { url, timeout_secs } => Self::Timeout {
                url: redact(&url, license_key),
                timeout_secs,
            },
            Self::Status { url, status } => Self::Status {
                url: redact(&url, license_key),
                status,
            },
            other => other,
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Total time allowed for the request, body included.
    pub timeout: Duration,
}

impl RequestOptions {
    /// Options with the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Trait for the HTTP operations the sync engine performs.
pub trait HttpClient: Send + Sync {
    /// Perform a GET request and return the body bytes verbatim.
    fn get(&self, url: &str, options: &RequestOptions) -> Result<Vec<u8>, TransportError>;

    /// Perform a GET request and stream the body into `sink`.
    ///
    /// Returns the number of bytes written.
    fn download_to_file(
        &self,
        url: &str,
        options: &RequestOptions,
        sink: &Path,
    ) -> Result<u64, TransportError>;
}

/// Blocking reqwest-based client.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a client with default settings.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(user_agent())
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self { client })
    }

    fn send(&self, url: &str, options: &RequestOptions) -> Result<Response, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(options.timeout)
            .send()
            .map_err(|e| request_error(url, options, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get(&self, url: &str, options: &RequestOptions) -> Result<Vec<u8>, TransportError> {
        self.send(url, options)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| request_error(url, options, e))
    }

    fn download_to_file(
        &self,
        url: &str,
        options: &RequestOptions,
        sink: &Path,
    ) -> Result<u64, TransportError> {
        let mut response = self.send(url, options)?;

        let io_error = |source| TransportError::Io {
            path: sink.to_path_buf(),
            source,
        };

        let file = File::create(sink).map_err(io_error)?;
        let mut writer = BufWriter::new(file);

        // Read errors surface as io::Error wrapping the reqwest error.
        let written = io::copy(&mut response, &mut writer).map_err(io_error)?;
        writer.flush().map_err(io_error)?;

        Ok(written)
    }
}

fn request_error(url: &str, options: &RequestOptions, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
            timeout_secs: options.timeout.as_secs(),
        }
    } else {
        // The URL is kept on the variant only, where it can be redacted.
        TransportError::Request {
            url: url.to_string(),
            source: e.without_url(),
        }
    }
}
