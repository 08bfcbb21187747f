//! The gallery as a whole: a root directory of image folders.
//!
//! [`Gallery`] is the entry point for callers that think in logical paths
//! (`""` for the root, `"trips/2024"` for a folder) rather than directories.
//! It validates those paths, resolves image references, runs the operation
//! in the matching directory and publishes a [`ChangeEvent`] for every file it
//! creates, renames or removes.
//!
//! Every call re-reads the filesystem; nothing is cached between calls.

use crate::config::GalleryConfig;
use crate::events::{ChangeEvent, ChangeKind, EventHub};
use crate::hash::{ContentHash, ImageRef, hash_file};
use crate::import::{ImportError, Imported, import};
use crate::migrate::{MigrateError, MigrationReport, migrate};
use crate::reorder::{Rename, ReorderError, ReorderOutcome, Respaced, reorder, respace_all};
use crate::scan::{DirEntry, Image, ScanError, find_filename, list, list_dirs};
use crate::store::{self, StoreError};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Receiver;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Invalid gallery path {0:?}: must be relative and must not contain '..'")]
    InvalidPath(String),
    #[error("Not a gallery directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Migration error: {0}")]
    Migrate(#[from] MigrateError),
    #[error("Reorder error: {0}")]
    Reorder(ReorderError),
    #[error("Import error: {0}")]
    Import(#[from] ImportError),
}

impl From<ReorderError> for GalleryError {
    fn from(e: ReorderError) -> Self {
        match e {
            ReorderError::NotFound(id) => Self::NotFound(id.to_string()),
            other => Self::Reorder(other),
        }
    }
}

pub struct Gallery {
    root: PathBuf,
    config: GalleryConfig,
    events: EventHub<ChangeEvent>,
}

impl Gallery {
    pub fn new(root: impl Into<PathBuf>, config: GalleryConfig) -> Self {
        Self {
            root: root.into(),
            config,
            events: EventHub::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    /// Receive change events from now on, buffering up to `capacity`.
    pub fn subscribe(&self, capacity: usize) -> Receiver<ChangeEvent> {
        self.events.subscribe(capacity)
    }

    /// Directory of a logical sub-path.
    pub fn dir(&self, sub: &str) -> Result<PathBuf, GalleryError> {
        let rel = Path::new(sub);
        if !rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(GalleryError::InvalidPath(sub.to_string()));
        }
        let dir = self.root.join(rel);
        if !dir.is_dir() {
            return Err(GalleryError::NotADirectory(dir));
        }
        Ok(dir)
    }

    /// Directory of a logical sub-path, with any legacy `metadata.json`
    /// already folded into the timestamp store.
    fn store_dir(&self, sub: &str) -> Result<PathBuf, GalleryError> {
        let dir = self.dir(sub)?;
        if let Err(e) = migrate(&dir) {
            log::warn!("legacy metadata migration failed in {}: {e}", dir.display());
        }
        Ok(dir)
    }

    /// Ordered image listing of a folder.
    pub fn images(&self, sub: &str) -> Result<Vec<Image>, GalleryError> {
        Ok(list(&self.dir(sub)?, &self.config, sub)?)
    }

    /// Resolve an image reference to its hash and current filename.
    pub fn locate(&self, sub: &str, image: &ImageRef) -> Result<(ContentHash, String), GalleryError> {
        let dir = self.dir(sub)?;
        self.locate_in(&dir, image)
    }

    pub fn reorder(
        &self,
        sub: &str,
        target: &ImageRef,
        prev: Option<&ImageRef>,
        next: Option<&ImageRef>,
    ) -> Result<ReorderOutcome, GalleryError> {
        let dir = self.dir(sub)?;
        let target = self.hash_of(&dir, target)?;
        let prev = prev.map(|r| self.hash_of(&dir, r)).transpose()?;
        let next = next.map(|r| self.hash_of(&dir, r)).transpose()?;
        let outcome = reorder(&dir, &self.config, &target, prev.as_ref(), next.as_ref())?;
        self.publish_renames(sub, &outcome.renamed);
        Ok(outcome)
    }

    pub fn import(&self, sub: &str, sources: &[PathBuf]) -> Result<Vec<Imported>, GalleryError> {
        let imported = import(&self.dir(sub)?, &self.config, sources)?;
        for entry in &imported {
            self.publish(ChangeKind::Created, sub, &entry.filename);
        }
        Ok(imported)
    }

    /// Remove an image file with its timestamp and dialog entries. Returns
    /// the removed filename.
    pub fn delete(&self, sub: &str, image: &ImageRef) -> Result<String, GalleryError> {
        let dir = self.store_dir(sub)?;
        let (hash, name) = self.locate_in(&dir, image)?;
        fs::remove_file(dir.join(&name))?;
        log::info!("deleted {name}");
        let by_hash = ImageRef::Hash(hash);
        if let Err(e) = store::delete_timestamp(&dir, &by_hash) {
            log::warn!("cannot delete timestamp entry of {name}: {e}");
        }
        // Legacy entries are keyed by filename; the content entry by hash
        for r in [ImageRef::filename(name.clone()), by_hash] {
            if let Err(e) = store::delete_dialog(&dir, &r) {
                log::warn!("cannot delete dialog entry of {name}: {e}");
            }
        }
        self.publish(ChangeKind::Removed, sub, &name);
        Ok(name)
    }

    /// Spread every image of a folder evenly over its time span.
    pub fn respace(&self, sub: &str) -> Result<Respaced, GalleryError> {
        let respaced = respace_all(&self.dir(sub)?, &self.config)?;
        self.publish_renames(sub, &respaced.renamed);
        Ok(respaced)
    }

    pub fn migrate(&self, sub: &str) -> Result<Option<MigrationReport>, GalleryError> {
        Ok(migrate(&self.dir(sub)?)?)
    }

    /// Subfolders of a folder. At the root only folders holding images count.
    pub fn dirs(&self, sub: &str) -> Result<Vec<DirEntry>, GalleryError> {
        let root_level = Path::new(sub)
            .components()
            .all(|c| c == Component::CurDir);
        Ok(list_dirs(&self.dir(sub)?, &self.config.images, root_level)?)
    }

    // =========================================================================
    // Store access
    // =========================================================================

    /// Raw stored timestamp of an image, if any.
    pub fn timestamp(&self, sub: &str, image: &ImageRef) -> Result<Option<String>, GalleryError> {
        Ok(store::load_timestamp(&self.store_dir(sub)?, image)?)
    }

    pub fn set_timestamp(&self, sub: &str, image: &ImageRef, timestamp: &str) -> Result<(), GalleryError> {
        Ok(store::save_timestamp(&self.store_dir(sub)?, image, timestamp)?)
    }

    pub fn delete_timestamp(&self, sub: &str, image: &ImageRef) -> Result<(), GalleryError> {
        Ok(store::delete_timestamp(&self.store_dir(sub)?, image)?)
    }

    /// Dialog lines of an image, read through its filename so legacy
    /// entries are found too.
    pub fn dialog(&self, sub: &str, image: &ImageRef) -> Result<Vec<String>, GalleryError> {
        let dir = self.dir(sub)?;
        let (_, name) = self.locate_in(&dir, image)?;
        Ok(store::load_dialog(&dir, &ImageRef::Filename(name))?)
    }

    pub fn set_dialog(&self, sub: &str, image: &ImageRef, entries: &[String]) -> Result<(), GalleryError> {
        let dir = self.dir(sub)?;
        let (_, name) = self.locate_in(&dir, image)?;
        Ok(store::save_dialog(&dir, &ImageRef::Filename(name), entries)?)
    }

    pub fn delete_dialog(&self, sub: &str, image: &ImageRef) -> Result<(), GalleryError> {
        let dir = self.dir(sub)?;
        let (_, name) = self.locate_in(&dir, image)?;
        Ok(store::delete_dialog(&dir, &ImageRef::Filename(name))?)
    }

    /// Dialog lines of every listed image. An unreadable entry yields an
    /// empty list for that image.
    pub fn dialogs(&self, sub: &str) -> Result<BTreeMap<ContentHash, Vec<String>>, GalleryError> {
        let dir = self.dir(sub)?;
        Ok(list(&dir, &self.config, sub)?
            .into_iter()
            .map(|image| {
                let entries = store::load_dialog(&dir, &ImageRef::Filename(image.filename))
                    .unwrap_or_else(|e| {
                        log::warn!("cannot read dialog of {}: {e}", image.id);
                        Vec::new()
                    });
                (image.id, entries)
            })
            .collect())
    }

    fn locate_in(&self, dir: &Path, image: &ImageRef) -> Result<(ContentHash, String), GalleryError> {
        match image {
            ImageRef::Hash(hash) => find_filename(dir, hash, &self.config.images)?
                .map(|name| (hash.clone(), name))
                .ok_or_else(|| GalleryError::NotFound(hash.to_string())),
            ImageRef::Filename(name) => match hash_file(&dir.join(name)) {
                Ok(hash) => Ok((hash, name.clone())),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(GalleryError::NotFound(name.clone()))
                }
                Err(e) => Err(e.into()),
            },
        }
    }

    fn hash_of(&self, dir: &Path, image: &ImageRef) -> Result<ContentHash, GalleryError> {
        match image {
            ImageRef::Hash(hash) => Ok(hash.clone()),
            ImageRef::Filename(_) => self.locate_in(dir, image).map(|(hash, _)| hash),
        }
    }

    fn publish_renames(&self, sub: &str, renames: &[Rename]) {
        for rename in renames {
            self.publish(ChangeKind::Renamed, sub, &rename.to);
        }
    }

    fn publish(&self, kind: ChangeKind, sub: &str, name: &str) {
        self.events.publish(ChangeEvent {
            kind,
            path: Path::new(sub).join(name),
        });
    }
}
