//! Directory scanning and the ordered image listing.
//!
//! A gallery directory is a flat folder of image files plus the `metadata/`
//! store. Listing it means:
//!
//! 1. Migrate a legacy `metadata.json`, if one is still there.
//! 2. Collect the regular files (non-recursive) whose extension is a
//!    configured image extension, in filename order.
//! 3. Hash every candidate in parallel.
//! 4. Walk the results in filename order, keeping only the first file for
//!    each content hash. Two files with identical bytes are one image, no
//!    matter how they are named.
//! 5. Resolve each image's ordering key (store entry, then the fallbacks in
//!    [`crate::metadata`]) and sort ascending.
//!
//! A file that cannot be hashed (deleted mid-scan, unreadable) is left out
//! of the result rather than failing the listing. Only an unreadable gallery
//! directory is an error.
//!
//! Images with equal keys keep filename order within one call, but nothing
//! guarantees that across calls: fallback keys such as modification times can
//! change between scans.

use crate::config::{GalleryConfig, ImagesConfig};
use crate::hash::{ContentHash, ImageRef, hash_file};
use crate::metadata::{TimestampSource, resolve_timestamp};
use crate::migrate::migrate;
use crate::naming::SortKey;
use crate::store::{self, METADATA_DIR};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read gallery directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// One image in the ordered listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    /// Content hash, the image's identity.
    pub id: ContentHash,
    /// Current filename within the gallery directory.
    pub filename: String,
    /// Where a client fetches the image bytes.
    pub url: String,
    /// Ordering key.
    pub timestamp: SortKey,
    /// Which source produced `timestamp`.
    pub source: TimestampSource,
}

/// A subdirectory of a gallery with its content counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub image_count: usize,
    pub dir_count: usize,
}

/// List the images of a gallery directory in display order.
///
/// `sub` is the logical path of `dir` below the gallery root (empty for the
/// root itself); it only affects the derived URLs.
pub fn list(dir: &Path, config: &GalleryConfig, sub: &str) -> Result<Vec<Image>, ScanError> {
    if let Err(e) = migrate(dir) {
        log::warn!("legacy metadata migration failed in {}: {e}", dir.display());
    }

    let hashed: Vec<(String, PathBuf, std::io::Result<ContentHash>)> =
        image_files(dir, &config.images)?
            .into_par_iter()
            .map(|(name, path)| {
                let hash = hash_file(&path);
                (name, path, hash)
            })
            .collect();

    let mut seen = HashSet::new();
    let mut images = Vec::with_capacity(hashed.len());
    for (name, path, hash) in hashed {
        let hash = match hash {
            Ok(h) => h,
            Err(e) => {
                log::debug!("skipping {name}: {e}");
                continue;
            }
        };
        if !seen.insert(hash.clone()) {
            log::debug!("skipping {name}: duplicate content of {hash}");
            continue;
        }
        let stored = match store::load_timestamp(dir, &ImageRef::Hash(hash.clone())) {
            Ok(ts) => ts,
            Err(e) => {
                log::warn!("cannot read timestamp entry for {name}: {e}");
                None
            }
        };
        let (timestamp, source) = resolve_timestamp(&path, stored.as_deref());
        images.push(Image {
            url: image_url(&config.urls.image_base, &hash, sub),
            id: hash,
            filename: name,
            timestamp,
            source,
        });
    }

    images.sort_by_key(|image| image.timestamp);
    Ok(images)
}

/// Find the current filename of the image with the given content hash.
pub fn find_filename(
    dir: &Path,
    hash: &ContentHash,
    images: &ImagesConfig,
) -> Result<Option<String>, ScanError> {
    for (name, path) in image_files(dir, images)? {
        match hash_file(&path) {
            Ok(h) if h == *hash => return Ok(Some(name)),
            Ok(_) => {}
            Err(e) => log::debug!("skipping {name}: {e}"),
        }
    }
    Ok(None)
}

/// List the subdirectories of `dir` with image and subdirectory counts.
///
/// At the gallery root (`root_level`) only directories that directly contain
/// images are listed. The metadata store is never listed.
pub fn list_dirs(
    dir: &Path,
    images: &ImagesConfig,
    root_level: bool,
) -> Result<Vec<DirEntry>, ScanError> {
    let mut entries = Vec::new();
    for entry in read_entries(dir)? {
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name == METADATA_DIR
            || name == store::dialog::LEGACY_DIALOG_DIR
            || name.starts_with('.')
        {
            continue;
        }
        let Ok(children) = read_entries(entry.path()) else {
            continue;
        };
        let mut image_count = 0;
        let mut dir_count = 0;
        for child in children {
            if child.file_type().is_dir() {
                dir_count += 1;
            } else if images.is_image(&child.file_name().to_string_lossy()) {
                image_count += 1;
            }
        }
        if root_level && image_count == 0 {
            continue;
        }
        entries.push(DirEntry {
            name,
            image_count,
            dir_count,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// URL of an image: `<base>/<hash>`, with `?path=<sub>` for subdirectories.
pub fn image_url(base: &str, hash: &ContentHash, sub: &str) -> String {
    let base = base.trim_end_matches('/');
    if sub.is_empty() {
        format!("{base}/{hash}")
    } else {
        format!("{base}/{hash}?path={}", query_escape(sub))
    }
}

/// Regular image files directly inside `dir`, sorted by name.
pub(crate) fn image_files(
    dir: &Path,
    images: &ImagesConfig,
) -> Result<Vec<(String, PathBuf)>, ScanError> {
    Ok(read_entries(dir)?
        .into_iter()
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            images
                .is_image(&name)
                .then(|| (name, e.into_path()))
        })
        .collect())
}

/// Direct children of `dir`, sorted by name. Unreadable children are skipped;
/// an unreadable `dir` is an error.
fn read_entries(dir: &Path) -> Result<Vec<walkdir::DirEntry>, ScanError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        match entry {
            Ok(e) => entries.push(e),
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => log::debug!("skipping unreadable entry: {e}"),
        }
    }
    Ok(entries)
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn query_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
