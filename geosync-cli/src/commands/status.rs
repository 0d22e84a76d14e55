//! `geosync status`

use geosync::SyncEngine;

use super::common::{resolve_sync_config, Overrides};
use crate::error::CliError;

/// Print the state of the managed library and whether an update is due.
pub fn run(overrides: &Overrides) -> Result<(), CliError> {
    let config = overrides.load_config()?;
    let mut engine = SyncEngine::new(resolve_sync_config(&config)?)?;

    println!("Storage:  {}", engine.storage_root().path().display());
    println!("Library:  {}", engine.library_file_path().display());

    if !engine.has_local_file() {
        println!("Local:    (none)");
        println!("Status:   sync required");
        return Ok(());
    }

    match engine.local_checksum()? {
        Some(checksum) => println!("Local:    {}", checksum),
        None => println!("Local:    (missing)"),
    }

    let required = engine.is_download_required()?;
    let remote = engine.foreign_checksum()?;
    println!("Remote:   {}", remote);
    println!(
        "Status:   {}",
        if required { "sync required" } else { "up to date" }
    );

    Ok(())
}
