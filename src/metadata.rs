//! Ordering timestamp resolution.
//!
//! Every listed image needs a position, including files that were copied into
//! the directory by hand and never went through an import or reorder. The
//! position comes from the first source that yields a valid instant:
//!
//! 1. **Store**: the image's entry in the timestamp store, when present and
//!    parseable as RFC 3339.
//! 2. **Filename**: a leading `YYYYMMDDHHMMSS` prefix
//!    (`20240102030405-000000001.jpg`).
//! 3. **EXIF**: `DateTimeOriginal`, the capture time recorded by the camera.
//! 4. **Modified**: the file's last-modified time.
//!
//! If even the modification time is unreadable (the file vanished between the
//! directory scan and this call) the current time is used, which sorts the
//! image last.
//!
//! The store entry is authoritative once written; the other three only place
//! images that have never been ordered explicitly.

use crate::naming::{self, SortKey};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Where a resolved ordering timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    Store,
    Filename,
    Exif,
    Modified,
    Now,
}

impl TimestampSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Filename => "filename",
            Self::Exif => "exif",
            Self::Modified => "modified",
            Self::Now => "now",
        }
    }
}

/// Resolve the ordering key of an image.
///
/// `stored` is the raw timestamp store entry, if any. An entry that does not
/// parse is logged and the fallback chain is used instead.
pub fn resolve_timestamp(path: &Path, stored: Option<&str>) -> (SortKey, TimestampSource) {
    if let Some(raw) = stored {
        match SortKey::parse_rfc3339(raw) {
            Some(key) => return (key, TimestampSource::Store),
            None => log::warn!(
                "unparseable stored timestamp {raw:?} for {}, falling back",
                path.display()
            ),
        }
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    naming::parse_prefix(&name)
        .map(|k| (k, TimestampSource::Filename))
        .or_else(|| exif_capture_time(path).map(|k| (k, TimestampSource::Exif)))
        .or_else(|| modified_time(path).map(|k| (k, TimestampSource::Modified)))
        .unwrap_or_else(|| (SortKey::now(), TimestampSource::Now))
}

/// EXIF `DateTimeOriginal` of an image, interpreted as UTC.
pub fn exif_capture_time(path: &Path) -> Option<SortKey> {
    let file = File::open(path).ok()?;
    let data = exif::Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()?;
    let field = data.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    let exif::Value::Ascii(ref values) = field.value else {
        return None;
    };
    let dt = exif::DateTime::from_ascii(values.first()?).ok()?;
    let naive = NaiveDate::from_ymd_opt(dt.year.into(), dt.month.into(), dt.day.into())?
        .and_hms_opt(dt.hour.into(), dt.minute.into(), dt.second.into())?;
    Some(SortKey::from_datetime(naive.and_utc()))
}

/// Last-modified time of a file.
pub fn modified_time(path: &Path) -> Option<SortKey> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(SortKey::from_datetime(DateTime::<Utc>::from(modified)))
}
