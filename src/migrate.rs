//! One-time upgrade from the flat `metadata.json` file.
//!
//! Early galleries kept every ordering timestamp in a single JSON object at
//! the directory root, keyed by filename:
//!
//! ```json
//! { "20240102030405-500000000.jpg": "2024-01-02T03:04:05.5Z" }
//! ```
//!
//! [`migrate`] copies each entry into the sharded timestamp store (hashing the
//! named file to find its key) and then deletes the flat file. It runs before
//! every listing, reorder and import, so the two layouts are never read
//! together: once the flat file is gone, the sharded store is the only one.
//!
//! Running it again is a no-op because there is nothing left to migrate.

use crate::hash::ImageRef;
use crate::store::{self, StoreError};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the legacy flat metadata file in a gallery directory.
pub const LEGACY_METADATA_FILE: &str = "metadata.json";

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Could not migrate entry for {name}: {source}")]
    Entry { name: String, source: StoreError },
}

/// Outcome of a migration pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Entries copied into the sharded store.
    pub migrated: usize,
    /// Entries whose image no longer exists.
    pub skipped: Vec<String>,
}

/// Path of the legacy flat metadata file.
pub fn legacy_path(dir: &Path) -> PathBuf {
    dir.join(LEGACY_METADATA_FILE)
}

/// Move `metadata.json` entries into the sharded store, then delete it.
///
/// - Absent file: silent no-op, `Ok(None)`.
/// - Unparseable file: logged and left in place untouched, `Ok(None)`.
/// - Entries naming a file that no longer exists are skipped.
/// - Any other I/O failure aborts before the flat file is deleted, so a
///   later call can retry.
pub fn migrate(dir: &Path) -> Result<Option<MigrationReport>, MigrateError> {
    let path = legacy_path(dir);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let entries: BTreeMap<String, String> = match serde_json::from_str(&content) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("not migrating malformed {}: {e}", path.display());
            return Ok(None);
        }
    };

    let mut report = MigrationReport::default();
    for (name, timestamp) in entries {
        match store::save_timestamp(dir, &ImageRef::filename(name.clone()), &timestamp) {
            Ok(()) => report.migrated += 1,
            Err(StoreError::ImageNotFound(_)) => {
                log::debug!("legacy entry {name} has no image, skipping");
                report.skipped.push(name);
            }
            Err(source) => return Err(MigrateError::Entry { name, source }),
        }
    }
    fs::remove_file(&path)?;
    log::info!(
        "migrated {} legacy timestamp(s) in {} ({} skipped)",
        report.migrated,
        dir.display(),
        report.skipped.len()
    );
    Ok(Some(report))
}
