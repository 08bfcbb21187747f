//! Dialog entries: an ordered list of free-form text lines per image.
//!
//! Stored as a pretty-printed JSON array in
//! `metadata/<shard>/<hash>/dialog.json`, next to the timestamp entry of the
//! same image. When saved through a filename, an `image` symlink in the same
//! directory points back at the file so the metadata tree can be browsed by
//! hand.
//!
//! ## Legacy layouts
//!
//! Older galleries keyed dialogs by the SHA-256 of the *filename* instead of
//! the content:
//!
//! ```text
//! dialogs/<namehash>.json              # flat
//! dialogs/<namehash[0:2]>/<namehash>.json  # nested
//! ```
//!
//! These are still read when the content-keyed entry is missing, and
//! [`move_dialog`] carries them along when a file is renamed. New writes
//! always go to the content-keyed layout.

use super::{StoreError, dialog_path, entry_dir};
use crate::hash::{ImageRef, hash_name};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DIALOG_FILENAME: &str = "dialog.json";
/// Root of the legacy filename-keyed dialog layouts.
pub const LEGACY_DIALOG_DIR: &str = "dialogs";
/// Symlink inside an entry directory pointing at the image file.
const IMAGE_LINK: &str = "image";

/// Store the dialog lines for an image, replacing any previous entry.
pub fn save_dialog(dir: &Path, image: &ImageRef, entries: &[String]) -> Result<(), StoreError> {
    let hash = image
        .resolve(dir)?
        .ok_or_else(|| StoreError::ImageNotFound(dir.join(image.to_string())))?;
    let leaf = entry_dir(dir, &hash);
    fs::create_dir_all(&leaf)?;
    if let ImageRef::Filename(name) = image {
        link_image(&leaf, name);
    }
    fs::write(dialog_path(dir, &hash), serde_json::to_string_pretty(entries)?)?;
    Ok(())
}

/// Load the dialog lines for an image.
///
/// Returns an empty list when the image or its entry does not exist.
pub fn load_dialog(dir: &Path, image: &ImageRef) -> Result<Vec<String>, StoreError> {
    let Some(hash) = image.resolve(dir)? else {
        return Ok(Vec::new());
    };
    if let Some(entries) = read_entries(&dialog_path(dir, &hash))? {
        return Ok(entries);
    }
    if let ImageRef::Filename(name) = image {
        for path in legacy_paths(dir, name) {
            if let Some(entries) = read_entries(&path)? {
                log::debug!("dialog for {name} read from legacy {}", path.display());
                return Ok(entries);
            }
        }
    }
    Ok(Vec::new())
}

/// Remove the dialog entry of an image. Missing entries are not an error.
pub fn delete_dialog(dir: &Path, image: &ImageRef) -> Result<(), StoreError> {
    if let ImageRef::Filename(name) = image {
        for path in legacy_paths(dir, name) {
            remove_if_exists(&path)?;
        }
    }
    let Some(hash) = image.resolve(dir)? else {
        return Ok(());
    };
    let leaf = entry_dir(dir, &hash);
    remove_if_exists(&dialog_path(dir, &hash))?;
    remove_if_exists(&leaf.join(IMAGE_LINK))?;
    // Only succeeds once the directory is empty.
    match fs::remove_dir(&leaf) {
        Ok(()) => {}
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::DirectoryNotEmpty | io::ErrorKind::NotFound
            ) => {}
        Err(e) => log::debug!("keeping dialog directory {}: {e}", leaf.display()),
    }
    Ok(())
}

/// Carry an image's dialog over from `old_name` to `new_name`.
///
/// Content-keyed entries are unaffected by a rename; only the `image` link
/// is refreshed. Legacy filename-keyed entries are moved to the key of the
/// new name.
pub fn move_dialog(dir: &Path, old_name: &str, new_name: &str) -> Result<(), StoreError> {
    if old_name == new_name {
        return Ok(());
    }
    if let Some(hash) = ImageRef::filename(new_name).resolve(dir)? {
        let leaf = entry_dir(dir, &hash);
        if leaf.is_dir() {
            link_image(&leaf, new_name);
        }
    }
    let old_paths = legacy_paths(dir, old_name);
    let new_paths = legacy_paths(dir, new_name);
    for (from, to) in old_paths.iter().zip(&new_paths) {
        if !from.is_file() {
            continue;
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(from, to)?;
        log::debug!("moved legacy dialog {} -> {}", from.display(), to.display());
    }
    Ok(())
}

/// Flat and nested legacy locations for a filename, in lookup order.
fn legacy_paths(dir: &Path, name: &str) -> [PathBuf; 2] {
    let key = hash_name(name);
    let root = dir.join(LEGACY_DIALOG_DIR);
    [
        root.join(format!("{key}.json")),
        root.join(&key[..2]).join(format!("{key}.json")),
    ]
}

fn read_entries(path: &Path) -> Result<Option<Vec<String>>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_str(&content) {
        Ok(entries) => Ok(Some(entries)),
        Err(e) => {
            log::warn!("ignoring malformed dialog {}: {e}", path.display());
            Ok(None)
        }
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Point `<leaf>/image` at `<dir>/<name>`. Best effort.
#[cfg(unix)]
fn link_image(leaf: &Path, name: &str) {
    let link = leaf.join(IMAGE_LINK);
    let _ = fs::remove_file(&link);
    // leaf is <dir>/metadata/<shard>/<hash>
    let target = Path::new("../../..").join(name);
    if let Err(e) = std::os::unix::fs::symlink(&target, &link) {
        log::debug!("could not link {}: {e}", link.display());
    }
}

#[cfg(not(unix))]
fn link_image(_leaf: &Path, _name: &str) {}
