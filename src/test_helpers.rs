//! Shared test utilities for the gallery-order test suite.
//!
//! Provides fixture builders for temporary gallery directories, lookup
//! helpers, and ordering assertions over listing results (`Image`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_gallery(&[
//!     ("20240101000001-000000000.jpg", "a"),
//!     ("20240101000002-000000000.jpg", "b"),
//! ]);
//! let images = list(tmp.path(), &GalleryConfig::default(), "").unwrap();
//!
//! let b = find_by_name(&images, "20240101000002-000000000.jpg");
//! assert_non_decreasing(&images);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::hash::{ContentHash, ImageRef, hash_file};
use crate::scan::Image;
use crate::store::save_timestamp;

// =========================================================================
// Fixture setup
// =========================================================================

/// Write an image file with the given content and return its hash.
///
/// The bytes are not a real image; only their hash matters to the store.
pub fn write_image(dir: &Path, name: &str, content: &str) -> ContentHash {
    let path = dir.join(name);
    fs::write(&path, content.as_bytes()).unwrap();
    hash_file(&path).unwrap()
}

/// A temp gallery holding `(filename, content)` files.
pub fn setup_gallery(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (name, content) in files {
        write_image(tmp.path(), name, content);
    }
    tmp
}

/// Record an explicit store timestamp for an existing file.
pub fn set_timestamp(dir: &Path, name: &str, timestamp: &str) {
    save_timestamp(dir, &ImageRef::filename(name), timestamp).unwrap();
}

// =========================================================================
// Listing lookups: panics with a clear message on miss
// =========================================================================

/// Find an image by hash. Panics if not found.
pub fn find_by_id<'a>(images: &'a [Image], id: &ContentHash) -> &'a Image {
    images.iter().find(|i| &i.id == id).unwrap_or_else(|| {
        panic!(
            "image {id} not found. Available: {:?}",
            filenames(images)
        )
    })
}

/// Find an image by current filename. Panics if not found.
pub fn find_by_name<'a>(images: &'a [Image], name: &str) -> &'a Image {
    images
        .iter()
        .find(|i| i.filename == name)
        .unwrap_or_else(|| panic!("image '{name}' not found. Available: {:?}", filenames(images)))
}

// =========================================================================
// Bulk extractors and assertions
// =========================================================================

/// All filenames in listing order.
pub fn filenames(images: &[Image]) -> Vec<&str> {
    images.iter().map(|i| i.filename.as_str()).collect()
}

/// All hashes in listing order.
pub fn ids(images: &[Image]) -> Vec<ContentHash> {
    images.iter().map(|i| i.id.clone()).collect()
}

/// Assert the listing is sorted ascending by timestamp.
pub fn assert_non_decreasing(images: &[Image]) {
    for pair in images.windows(2) {
        assert!(
            pair[0].timestamp <= pair[1].timestamp,
            "{} ({}) sorts after {} ({})",
            pair[0].filename,
            pair[0].timestamp,
            pair[1].filename,
            pair[1].timestamp
        );
    }
}
