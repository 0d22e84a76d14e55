//! Error types for the lookup path.

use thiserror::Error;

use crate::sync::BoxError;

/// Errors that can occur while resolving an address.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The input is not an IPv4 or IPv6 address.
    #[error("invalid IP address: {0:?}")]
    InvalidAddress(String),

    /// The database reader failed.
    #[error("database lookup failed: {0}")]
    Source(#[source] BoxError),

    /// The cache store failed.
    #[error("cache error: {0}")]
    Cache(String),

    /// A cached record could not be encoded or decoded.
    #[error("failed to (de)serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid reader configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
