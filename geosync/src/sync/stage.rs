//! Sync stages for progress reporting and error attribution.

use std::fmt;

/// Progress callback for sync operations.
///
/// Invoked once each time the engine enters a new stage.
pub type SyncProgressCallback = Box<dyn Fn(SyncStage) + Send + Sync>;

/// Stages of a sync cycle, in the order the engine walks through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStage {
    /// Reading the locally persisted checksum.
    ReadingLocalChecksum,
    /// Fetching the publisher's checksum.
    FetchingChecksum,
    /// Removing leftover work directories.
    Sweeping,
    /// Creating a fresh work directory.
    PreparingWorkDir,
    /// Downloading the library archive.
    Downloading,
    /// Extracting the downloaded archive.
    Extracting,
    /// Locating the extracted database file.
    Locating,
    /// Moving the database file into place.
    Replacing,
    /// Writing the new checksum file.
    Persisting,
    /// Sync finished.
    Complete,
}

impl SyncStage {
    /// Get a human-readable name for the stage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadingLocalChecksum => "reading local checksum",
            Self::FetchingChecksum => "fetching checksum",
            Self::Sweeping => "sweeping work directories",
            Self::PreparingWorkDir => "preparing work directory",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::Locating => "locating database file",
            Self::Replacing => "replacing library",
            Self::Persisting => "persisting checksum",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_matches_name() {
        assert_eq!(SyncStage::Downloading.to_string(), "downloading");
        assert_eq!(SyncStage::Locating.to_string(), SyncStage::Locating.name());
    }
}
