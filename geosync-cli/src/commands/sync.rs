//! `geosync sync`

use geosync::sync::SyncStage;
use geosync::SyncEngine;

use super::common::{resolve_sync_config, Overrides};
use crate::error::CliError;

/// Download the library when the publisher has a newer one.
///
/// With `force`, the download runs even if the checksums match.
pub fn run(overrides: &Overrides, force: bool) -> Result<(), CliError> {
    let config = overrides.load_config()?;
    let mut engine = SyncEngine::new(resolve_sync_config(&config)?)?
        .with_progress(Box::new(|stage: SyncStage| eprintln!("  {}", stage)));

    if force {
        let path = engine.run()?;
        println!("Library updated: {}", path.display());
        return Ok(());
    }

    if engine.sync_if_required()? {
        println!("Library updated: {}", engine.library_file_path().display());
    } else {
        println!("Library is up to date");
    }
    Ok(())
}
