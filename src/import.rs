//! Copying new images into a gallery.
//!
//! A batch of `n` files is placed at the end of "now": the current second,
//! with file `i` at fraction `(i+1)·10⁹/(n+1)`. The batch keeps its argument
//! order and sorts after everything imported in earlier seconds.
//!
//! ```text
//! import a.jpg b.png c.jpg   (at 2024-01-02T03:04:05Z)
//!   → 20240102030405-250000000.jpg
//!   → 20240102030405-500000000.png
//!   → 20240102030405-750000000.jpg
//! ```
//!
//! An existing file is never overwritten: a taken name is redrawn inside the
//! file's share of the second. Files that are not images, cannot be read, or
//! cannot be written are logged and skipped.

use crate::config::GalleryConfig;
use crate::hash::{ContentHash, hash_file};
use crate::migrate::migrate;
use crate::naming::{self, FRACTION_LIMIT, SortKey};
use crate::reorder::{free_name, record};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Not a gallery directory: {0}")]
    NotADirectory(PathBuf),
    #[error("No files to import")]
    Empty,
}

/// One file brought into the gallery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Imported {
    pub source: PathBuf,
    pub id: ContentHash,
    pub filename: String,
    pub timestamp: SortKey,
}

/// Copy `sources` into `dir` in order, recording a timestamp for each.
pub fn import(
    dir: &Path,
    config: &GalleryConfig,
    sources: &[PathBuf],
) -> Result<Vec<Imported>, ImportError> {
    if !dir.is_dir() {
        return Err(ImportError::NotADirectory(dir.to_path_buf()));
    }
    if sources.is_empty() {
        return Err(ImportError::Empty);
    }
    if let Err(e) = migrate(dir) {
        log::warn!("legacy metadata migration failed in {}: {e}", dir.display());
    }

    let second = SortKey::now().second();
    let n = sources.len() as u64;
    let limit = u64::from(FRACTION_LIMIT);
    let mut imported = Vec::with_capacity(sources.len());
    for (i, source) in sources.iter().enumerate() {
        let i = i as u64;
        let lo = ((i + 1) * limit / (n + 1)) as u32;
        let hi = ((i + 2) * limit / (n + 1)) as u32;
        match import_one(dir, config, source, second, lo..hi) {
            Ok(Some(entry)) => imported.push(entry),
            Ok(None) => {}
            Err(e) => log::warn!("cannot import {}: {e}", source.display()),
        }
    }
    log::info!(
        "imported {} of {} file(s) into {}",
        imported.len(),
        sources.len(),
        dir.display()
    );
    Ok(imported)
}

fn import_one(
    dir: &Path,
    config: &GalleryConfig,
    source: &Path,
    second: i64,
    slot: std::ops::Range<u32>,
) -> io::Result<Option<Imported>> {
    let original = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if !config.images.is_image(&original) {
        log::warn!("skipping {}: not an image", source.display());
        return Ok(None);
    }
    let ext = naming::extension(&original);
    let placement = match free_name(
        dir,
        "",
        second,
        slot.start,
        slot,
        &ext,
        config.reorder.max_name_attempts,
    ) {
        Ok(Some(p)) => p,
        Ok(None) => {
            log::warn!("skipping {}: no free filename", source.display());
            return Ok(None);
        }
        Err(e) => {
            log::warn!("skipping {}: {e}", source.display());
            return Ok(None);
        }
    };

    let dest = dir.join(&placement.name);
    let mut input = File::open(source)?;
    let mut output = OpenOptions::new().write(true).create_new(true).open(&dest)?;
    if let Err(e) = io::copy(&mut input, &mut output) {
        drop(output);
        if let Err(cleanup) = std::fs::remove_file(&dest) {
            log::warn!("cannot remove partial copy {}: {cleanup}", dest.display());
        }
        return Err(e);
    }
    let id = hash_file(&dest)?;
    record(dir, &id, placement.key);
    log::debug!("imported {} as {}", source.display(), placement.name);
    Ok(Some(Imported {
        source: source.to_path_buf(),
        id,
        filename: placement.name,
        timestamp: placement.key,
    }))
}
