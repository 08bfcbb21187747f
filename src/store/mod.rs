//! Sharded per-image key/value storage.
//!
//! Everything the gallery remembers about an image is keyed by its content
//! hash and lives under the gallery directory itself:
//!
//! ```text
//! <dir>/
//! ├── 20240102030405-500000000.jpg
//! ├── metadata.json                  # legacy flat file, removed by migration
//! └── metadata/
//!     └── 3a/                        # shard: first two hash characters
//!         ├── 3a7f…e1.json           # ordering timestamp (JSON string)
//!         └── 3a7f…e1/
//!             ├── dialog.json        # dialog lines (JSON array of strings)
//!             └── image -> ../../../20240102030405-500000000.jpg
//! ```
//!
//! Sharding on the first two characters keeps each `metadata/` subdirectory
//! small even for galleries with tens of thousands of images.
//!
//! There is no index and no cache: each lookup is a single file read, and
//! the filesystem is the only source of truth.

pub mod dialog;
pub mod timestamp;

pub use dialog::{delete_dialog, load_dialog, move_dialog, save_dialog};
pub use timestamp::{delete_timestamp, load_timestamp, save_timestamp};

use crate::hash::ContentHash;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory (inside a gallery directory) holding all sharded entries.
pub const METADATA_DIR: &str = "metadata";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image not found: {0}")]
    ImageNotFound(PathBuf),
}

/// `<dir>/metadata/<hash[0:2]>`
pub fn shard_dir(dir: &Path, hash: &ContentHash) -> PathBuf {
    dir.join(METADATA_DIR).join(hash.shard())
}

/// `<dir>/metadata/<hash[0:2]>/<hash>.json`
pub fn timestamp_path(dir: &Path, hash: &ContentHash) -> PathBuf {
    shard_dir(dir, hash).join(format!("{hash}.json"))
}

/// `<dir>/metadata/<hash[0:2]>/<hash>/`
pub fn entry_dir(dir: &Path, hash: &ContentHash) -> PathBuf {
    shard_dir(dir, hash).join(hash.as_str())
}

/// `<dir>/metadata/<hash[0:2]>/<hash>/dialog.json`
pub fn dialog_path(dir: &Path, hash: &ContentHash) -> PathBuf {
    entry_dir(dir, hash).join(dialog::DIALOG_FILENAME)
}
