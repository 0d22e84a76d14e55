//! `geosync sweep`

use geosync::sync::{RecoverySweeper, StorageRoot};

use super::common::Overrides;
use crate::error::CliError;

/// Remove work directories left behind by interrupted syncs.
///
/// Needs no license key.
pub fn run(overrides: &Overrides) -> Result<(), CliError> {
    let config = overrides.load_config()?;
    let root = StorageRoot::new(&config.storage.directory)?;

    println!("Sweeping work directories in: {}", root.path().display());
    let report = RecoverySweeper::new(root).sweep();
    println!("{}", report);

    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::Sweep(format!(
            "{} entries could not be removed",
            report.failures
        )))
    }
}
