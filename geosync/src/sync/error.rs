//! Error types for the sync engine.

use thiserror::Error;

use super::stage::SyncStage;

/// Boxed error used to carry an underlying cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while synchronizing the local library.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Any network, extraction or filesystem failure during a sync attempt.
    #[error("download failed while {stage}: {reason}")]
    DownloadFailed {
        stage: SyncStage,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Storage root or configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl SyncError {
    /// A `DownloadFailed` error without an underlying cause.
    pub(crate) fn download(stage: SyncStage, reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            stage,
            reason: reason.into(),
            source: None,
        }
    }

    /// A `DownloadFailed` error wrapping the error that caused it.
    pub(crate) fn download_caused(
        stage: SyncStage,
        reason: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::DownloadFailed {
            stage,
            reason: reason.into(),
            source: Some(source.into()),
        }
    }

    /// Returns true for operational (download) failures.
    pub fn is_download_failed(&self) -> bool {
        matches!(self, Self::DownloadFailed { .. })
    }

    /// The stage a download failure happened in.
    pub fn stage(&self) -> Option<SyncStage> {
        match self {
            Self::DownloadFailed { stage, .. } => Some(*stage),
            Self::InvalidConfiguration(_) => None,
        }
    }
}
