//! Moving images between neighbors.
//!
//! A drag-and-drop move names the image being moved and the images that should
//! end up directly before (`prev`) and after (`next`) it. Either neighbor may
//! be absent: no `prev` means "move to the front", no `next` means "move to the
//! end". The engine picks a new [`SortKey`] in three tiers, first match wins:
//!
//! | Tier | Condition | New key |
//! |------|-----------|---------|
//! | [`Tier::Gap`] | both neighbors, seconds more than 1 apart | midpoint second, random fraction |
//! | [`Tier::SameSecond`] | both neighbors in one second, fractions more than 1 apart | same second, midpoint fraction |
//! | [`Tier::GroupRespace`] | anything else | every image in the chosen second is respaced |
//!
//! The first two tiers touch one file. The group respace takes the second of
//! `prev` (else `next`, else the moved image's own), collects every listed
//! image in that second, inserts the moved image directly after `prev` (or
//! directly before `next`) and hands out evenly spaced fractions across the
//! whole group. Members other than the moved image keep their relative order.
//!
//! ## Fraction slots
//!
//! In a group of `n`, member `k` gets a slot of fractions that sorts strictly
//! between its neighbors' slots:
//!
//! - `n < 999`: the leading three digits are `(k+1)·999/(n+1)` and the low six
//!   digits are random (`20240101000000-499xxxxxx.jpg`).
//! - larger groups: `[(k+1)·10⁹/(n+1), (k+2)·10⁹/(n+1))`.
//!
//! Filename collisions redraw within the slot, so a redraw never changes the
//! order. After `max_name_attempts` misses, single-file tiers fail with
//! [`ReorderError::NameExhausted`]; group members keep their old filename.
//!
//! ## Failure policy
//!
//! Ordering lives in the timestamp store; the filename only mirrors it. A
//! rename or store write that fails is logged and skipped, and the operation
//! carries on with the remaining files. Only lookup failures (unknown image or
//! neighbor) and I/O errors reading the moved image's own entry are returned.

use crate::config::GalleryConfig;
use crate::hash::{ContentHash, ImageRef, hash_file};
use crate::metadata::TimestampSource;
use crate::naming::{self, FRACTION_LIMIT, SortKey};
use crate::scan::{self, Image, ScanError};
use crate::store::{self, StoreError};
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

/// Groups smaller than this use three-digit slot prefixes.
const COARSE_STEPS: u64 = 999;
/// Width of a three-digit slot in nanoseconds.
const COARSE_WIDTH: u32 = 1_000_000;

#[derive(Error, Debug)]
pub enum ReorderError {
    #[error("Image not found: {0}")]
    NotFound(ContentHash),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("No free filename in second {second} after {attempts} attempts")]
    NameExhausted { second: i64, attempts: u32 },
    #[error("Timestamp out of range: second {0}")]
    OutOfRange(i64),
}

/// Which strategy placed the moved image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Gap,
    SameSecond,
    GroupRespace,
}

/// A file rename performed during an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// Result of a reorder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReorderOutcome {
    /// Content hash of the moved image, recomputed after the rename.
    pub id: ContentHash,
    /// Its filename after the move.
    pub filename: String,
    /// Its new ordering key.
    pub timestamp: SortKey,
    pub tier: Tier,
    /// Every rename performed, including group members.
    pub renamed: Vec<Rename>,
}

/// Result of [`respace_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Respaced {
    /// Images given a new key.
    pub count: usize,
    pub renamed: Vec<Rename>,
}

/// A chosen key and the filename that mirrors it.
pub(crate) struct Placement {
    pub(crate) key: SortKey,
    pub(crate) name: String,
}

/// Move `target` so it sorts between `prev` and `next`.
pub fn reorder(
    dir: &Path,
    config: &GalleryConfig,
    target: &ContentHash,
    prev: Option<&ContentHash>,
    next: Option<&ContentHash>,
) -> Result<ReorderOutcome, ReorderError> {
    let images = scan::list(dir, config, "")?;
    let moved = lookup(&images, target)?;
    let prev = neighbor(&images, target, prev)?;
    let next = neighbor(&images, target, next)?;

    let old_stored = store::load_timestamp(dir, &ImageRef::Hash(target.clone()))?
        .as_deref()
        .and_then(SortKey::parse_rfc3339);
    let attempts = config.reorder.max_name_attempts;
    let ext = naming::extension(&moved.filename);

    let mut renamed = Vec::new();
    let mut rewritten: HashSet<ContentHash> = HashSet::new();

    let single = match (prev, next) {
        (Some(p), Some(n)) if n.timestamp.second() - p.timestamp.second() > 1 => {
            let (ps, ns) = (p.timestamp.second(), n.timestamp.second());
            let second = ps + (ns - ps) / 2;
            let first = rand::rng().random_range(0..FRACTION_LIMIT);
            Some((second, first, 0..FRACTION_LIMIT, Tier::Gap))
        }
        (Some(p), Some(n))
            if p.timestamp.second() == n.timestamp.second()
                && n.timestamp.fraction() > p.timestamp.fraction() + 1 =>
        {
            let (pf, nf) = (p.timestamp.fraction(), n.timestamp.fraction());
            Some((p.timestamp.second(), pf + (nf - pf) / 2, pf + 1..nf, Tier::SameSecond))
        }
        _ => None,
    };

    let (placed, tier) = match single {
        Some((second, first, slot, tier)) => {
            let placement = free_name(dir, &moved.filename, second, first, slot, &ext, attempts)?
                .ok_or(ReorderError::NameExhausted { second, attempts })?;
            let placed = apply(dir, &moved.id, &moved.filename, placement, &mut renamed);
            rewritten.insert(moved.id.clone());
            (placed, tier)
        }
        None => {
            let placed = respace_group(dir, &images, moved, prev, next, attempts, &mut renamed)?;
            rewritten.extend(placed.iter().map(|(image, _)| image.id.clone()));
            let moved_placed = placed
                .into_iter()
                .find(|(image, _)| image.id == moved.id)
                .map(|(_, p)| p)
                .ok_or_else(|| ReorderError::NotFound(target.clone()))?;
            (moved_placed, Tier::GroupRespace)
        }
    };

    // Images that tied with the moved image keep tying with it. Neighbors
    // are left alone so the move itself stays visible.
    if let Some(old) = old_stored {
        let neighbors: Vec<&ContentHash> = prev.iter().chain(next.iter()).map(|i| &i.id).collect();
        for image in images.iter().filter(|i| {
            i.source == TimestampSource::Store
                && i.timestamp == old
                && !rewritten.contains(&i.id)
                && !neighbors.contains(&&i.id)
        }) {
            log::debug!("{} tied with the moved image, following it", image.filename);
            record(dir, &image.id, placed.key);
        }
    }

    let id = match hash_file(&dir.join(&placed.name)) {
        Ok(id) => id,
        Err(e) => {
            log::warn!("cannot rehash {}: {e}", placed.name);
            target.clone()
        }
    };
    log::info!("moved {} to {} ({tier:?})", placed.name, placed.key);
    Ok(ReorderOutcome {
        id,
        filename: placed.name,
        timestamp: placed.key,
        tier,
        renamed,
    })
}

/// Spread every image evenly between the first and last image's second.
///
/// Images that land on the same second get evenly spaced fractions in their
/// current order; an image alone in its second gets a random fraction.
pub fn respace_all(dir: &Path, config: &GalleryConfig) -> Result<Respaced, ReorderError> {
    let images = scan::list(dir, config, "")?;
    let (Some(first), Some(last)) = (images.first(), images.last()) else {
        return Ok(Respaced::default());
    };
    let min = first.timestamp.second();
    let span = last.timestamp.second() - min;
    let count = images.len();
    let seconds: Vec<i64> = (0..count)
        .map(|i| {
            if count > 1 {
                min + span * i as i64 / (count as i64 - 1)
            } else {
                min
            }
        })
        .collect();

    let attempts = config.reorder.max_name_attempts;
    let mut renamed = Vec::new();
    let mut start = 0;
    while start < count {
        let second = seconds[start];
        let end = start + seconds[start..].iter().take_while(|&&s| s == second).count();
        let run = &images[start..end];
        for (k, image) in run.iter().enumerate() {
            let slot = if run.len() == 1 {
                0..FRACTION_LIMIT
            } else {
                slot(k, run.len())
            };
            let placement = place_in_slot(dir, image, second, slot, attempts)?;
            apply(dir, &image.id, &image.filename, placement, &mut renamed);
        }
        start = end;
    }
    log::info!(
        "respaced {count} image(s) in {} ({} renamed)",
        dir.display(),
        renamed.len()
    );
    Ok(Respaced { count, renamed })
}

/// Fractions member `k` of an `n`-member group may take.
fn slot(k: usize, n: usize) -> Range<u32> {
    let (k, n) = (k as u64, n as u64);
    if n < COARSE_STEPS {
        let pos = ((k + 1) * COARSE_STEPS / (n + 1)) as u32;
        pos * COARSE_WIDTH..(pos + 1) * COARSE_WIDTH
    } else {
        let limit = u64::from(FRACTION_LIMIT);
        let lo = (k + 1) * limit / (n + 1);
        let hi = (k + 2) * limit / (n + 1);
        lo as u32..hi as u32
    }
}

/// Respace the group the moved image lands in. Returns each member with its
/// final placement, in new order.
fn respace_group<'a>(
    dir: &Path,
    images: &'a [Image],
    moved: &'a Image,
    prev: Option<&Image>,
    next: Option<&Image>,
    attempts: u32,
    renamed: &mut Vec<Rename>,
) -> Result<Vec<(&'a Image, Placement)>, ReorderError> {
    let second = prev
        .or(next)
        .map(|i| i.timestamp.second())
        .unwrap_or_else(|| moved.timestamp.second());
    let mut group: Vec<&Image> = images
        .iter()
        .filter(|i| i.id != moved.id && i.timestamp.second() == second)
        .collect();
    let after_prev = prev
        .and_then(|p| group.iter().position(|i| i.id == p.id))
        .map(|k| k + 1);
    let before_next = next.and_then(|n| group.iter().position(|i| i.id == n.id));
    let at = after_prev
        .or(before_next)
        .unwrap_or_else(|| group.partition_point(|i| i.timestamp <= moved.timestamp));
    group.insert(at, moved);
    log::debug!("respacing {} image(s) in second {second}", group.len());

    let n = group.len();
    let mut placed = Vec::with_capacity(n);
    for (k, image) in group.into_iter().enumerate() {
        let placement = place_in_slot(dir, image, second, slot(k, n), attempts)?;
        placed.push((image, apply(dir, &image.id, &image.filename, placement, renamed)));
    }
    Ok(placed)
}

/// Pick a free name in `slot`, falling back to the current filename (with the
/// new key still recorded) when every attempt collides.
fn place_in_slot(
    dir: &Path,
    image: &Image,
    second: i64,
    slot: Range<u32>,
    attempts: u32,
) -> Result<Placement, ReorderError> {
    let first = rand::rng().random_range(slot.clone());
    let ext = naming::extension(&image.filename);
    match free_name(dir, &image.filename, second, first, slot, &ext, attempts)? {
        Some(placement) => Ok(placement),
        None => {
            log::warn!(
                "no free filename for {} in second {second}, keeping its name",
                image.filename
            );
            Ok(Placement {
                key: SortKey::at(second, first).ok_or(ReorderError::OutOfRange(second))?,
                name: image.filename.clone(),
            })
        }
    }
}

/// Try `first`, then random fractions from `slot`, until the filename for the
/// key is free (or is `current` itself).
pub(crate) fn free_name(
    dir: &Path,
    current: &str,
    second: i64,
    first: u32,
    slot: Range<u32>,
    ext: &str,
    attempts: u32,
) -> Result<Option<Placement>, ReorderError> {
    let mut rng = rand::rng();
    let mut fraction = first;
    for _ in 0..attempts {
        let key = SortKey::at(second, fraction).ok_or(ReorderError::OutOfRange(second))?;
        let name = key.file_name(ext);
        if name == current || !dir.join(&name).exists() {
            return Ok(Some(Placement { key, name }));
        }
        log::debug!("{name} is taken, redrawing");
        fraction = rng.random_range(slot.clone());
    }
    Ok(None)
}

/// Rename to the placement's filename and record its key. Returns the
/// placement with the filename the image actually ended up under.
fn apply(
    dir: &Path,
    id: &ContentHash,
    current: &str,
    placement: Placement,
    renamed: &mut Vec<Rename>,
) -> Placement {
    let name = if rename_image(dir, current, &placement.name) {
        if current != placement.name {
            renamed.push(Rename {
                from: current.to_string(),
                to: placement.name.clone(),
            });
        }
        placement.name
    } else {
        current.to_string()
    };
    record(dir, id, placement.key);
    Placement {
        key: placement.key,
        name,
    }
}

/// Rename a file inside `dir` and carry its dialog entry along. Failures are
/// logged; returns whether the file now has the new name.
pub(crate) fn rename_image(dir: &Path, from: &str, to: &str) -> bool {
    if from == to {
        return true;
    }
    match fs::rename(dir.join(from), dir.join(to)) {
        Ok(()) => {
            log::debug!("renamed {from} -> {to}");
            if let Err(e) = store::move_dialog(dir, from, to) {
                log::warn!("cannot move dialog entry of {from}: {e}");
            }
            true
        }
        Err(e) => {
            log::warn!("cannot rename {from} to {to}: {e}");
            false
        }
    }
}

/// Save a key to the timestamp store, logging failures.
pub(crate) fn record(dir: &Path, id: &ContentHash, key: SortKey) {
    if let Err(e) = store::save_timestamp(dir, &ImageRef::Hash(id.clone()), &key.to_rfc3339()) {
        log::warn!("cannot save timestamp for {id}: {e}");
    }
}

fn lookup<'a>(images: &'a [Image], id: &ContentHash) -> Result<&'a Image, ReorderError> {
    images
        .iter()
        .find(|i| &i.id == id)
        .ok_or_else(|| ReorderError::NotFound(id.clone()))
}

/// Resolve a neighbor. A neighbor equal to the moved image is ignored.
fn neighbor<'a>(
    images: &'a [Image],
    target: &ContentHash,
    id: Option<&ContentHash>,
) -> Result<Option<&'a Image>, ReorderError> {
    match id {
        Some(id) if id == target => {
            log::debug!("ignoring neighbor equal to the moved image");
            Ok(None)
        }
        Some(id) => lookup(images, id).map(Some),
        None => Ok(None),
    }
}
