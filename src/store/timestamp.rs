//! Ordering timestamp entries.
//!
//! One file per image, `metadata/<shard>/<hash>.json`, containing the
//! timestamp as a JSON string. The string is stored exactly as given, so a
//! save followed by a load returns the same text.

use super::{StoreError, timestamp_path};
use crate::hash::ImageRef;
use std::fs;
use std::io;
use std::path::Path;

/// Store `timestamp` for an image, replacing any previous entry.
///
/// A filename reference is hashed first; if that file does not exist the
/// call fails with [`StoreError::ImageNotFound`] since there is nothing to key on.
pub fn save_timestamp(dir: &Path, image: &ImageRef, timestamp: &str) -> Result<(), StoreError> {
    let hash = image
        .resolve(dir)?
        .ok_or_else(|| StoreError::ImageNotFound(dir.join(image.to_string())))?;
    let path = timestamp_path(dir, &hash);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, serde_json::to_string(timestamp)?)?;
    log::debug!("saved timestamp {timestamp} for {hash}");
    Ok(())
}

/// Load the stored timestamp for an image.
///
/// `Ok(None)` means "no ordering recorded": the entry is absent, the named
/// file no longer exists, or the entry is not a JSON string. Only genuine
/// I/O failures are errors.
pub fn load_timestamp(dir: &Path, image: &ImageRef) -> Result<Option<String>, StoreError> {
    let Some(hash) = image.resolve(dir)? else {
        return Ok(None);
    };
    let path = timestamp_path(dir, &hash);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_str::<String>(&content) {
        Ok(ts) => Ok(Some(ts)),
        Err(e) => {
            log::warn!("ignoring malformed timestamp entry {}: {e}", path.display());
            Ok(None)
        }
    }
}

/// Remove an image's timestamp entry. Missing entries are not an error.
pub fn delete_timestamp(dir: &Path, image: &ImageRef) -> Result<(), StoreError> {
    let Some(hash) = image.resolve(dir)? else {
        return Ok(());
    };
    match fs::remove_file(timestamp_path(dir, &hash)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
