//! Ordering keys and the `YYYYMMDDHHMMSS-NNNNNNNNN.ext` filename convention.
//!
//! Every image has an ordering timestamp: a UTC instant with nanosecond
//! precision. The gallery sorts ascending by it. [`SortKey`] exposes it as the
//! two parts the reorder engine actually works with:
//!
//! - **second**: the whole-second instant, rendered as the 14-digit filename
//!   prefix (`20240102030405`)
//! - **fraction**: nanoseconds within that second, rendered as the 9-digit
//!   zero-padded suffix (`000500000`)
//!
//! The authoritative copy of a key lives in the timestamp store. The filename
//! mirrors it so a directory listing in a file manager shows the gallery
//! order, but a stale filename never changes what the gallery displays.
//!
//! ## Text form
//!
//! Keys are persisted as RFC 3339 in UTC with the fraction's trailing zeros
//! trimmed: `2024-01-02T03:04:05.5Z`, `2024-01-02T03:04:05Z`. Parsing accepts
//! any RFC 3339 offset and normalises to UTC.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// `strftime` pattern of the second-precision filename prefix.
pub const PREFIX_FORMAT: &str = "%Y%m%d%H%M%S";
/// Digits in the filename prefix.
pub const PREFIX_LEN: usize = 14;
/// Digits in the sub-second filename suffix.
pub const SUFFIX_LEN: usize = 9;
/// Exclusive upper bound of a fraction (one second in nanoseconds).
pub const FRACTION_LIMIT: u32 = 1_000_000_000;

/// Position of an image in the gallery sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey(DateTime<Utc>);

impl SortKey {
    /// Key at `second` (Unix seconds) plus `fraction` nanoseconds.
    ///
    /// Returns `None` when the fraction is not below one second or the instant
    /// is outside the representable range.
    pub fn at(second: i64, fraction: u32) -> Option<Self> {
        if fraction >= FRACTION_LIMIT {
            return None;
        }
        DateTime::from_timestamp(second, fraction).map(Self)
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        // Leap-second instants carry a fraction >= 1s; fold them into the
        // last representable nanosecond.
        if dt.nanosecond() >= FRACTION_LIMIT {
            Self(dt.with_nanosecond(FRACTION_LIMIT - 1).unwrap_or(dt))
        } else {
            Self(dt)
        }
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn second(&self) -> i64 {
        self.0.timestamp()
    }

    pub fn fraction(&self) -> u32 {
        self.0.timestamp_subsec_nanos()
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Same second, different fraction.
    pub fn with_fraction(&self, fraction: u32) -> Option<Self> {
        Self::at(self.second(), fraction)
    }

    /// Parse an RFC 3339 timestamp, normalising to UTC.
    pub fn parse_rfc3339(s: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
    }

    /// RFC 3339 in UTC with the fraction's trailing zeros trimmed.
    pub fn to_rfc3339(&self) -> String {
        let mut out = self.0.format("%Y-%m-%dT%H:%M:%S").to_string();
        let fraction = self.fraction();
        if fraction > 0 {
            let digits = format!("{fraction:09}");
            out.push('.');
            out.push_str(digits.trim_end_matches('0'));
        }
        out.push('Z');
        out
    }

    /// The 14-digit second-precision filename prefix.
    pub fn prefix(&self) -> String {
        self.0.format(PREFIX_FORMAT).to_string()
    }

    /// Full filename for this key: `<prefix>-<fraction:09><ext>`.
    ///
    /// `ext` includes its leading dot (or is empty), as returned by [`extension`].
    pub fn file_name(&self, ext: &str) -> String {
        format!("{}-{:09}{}", self.prefix(), self.fraction(), ext)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for SortKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for SortKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_rfc3339(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid RFC 3339 timestamp: {s}")))
    }
}

/// Parse the second-precision prefix of a filename.
///
/// The prefix is everything before the first dash and must be exactly 14
/// digits forming a valid `YYYYMMDDHHMMSS` instant:
/// - `"20240102030405-000000001.jpg"` → 2024-01-02T03:04:05Z
/// - `"20240102030405-anything.png"` → 2024-01-02T03:04:05Z
/// - `"20240102030405.jpg"` → None (no dash, the extension is part of the prefix)
/// - `"IMG_0001.jpg"` → None
pub fn parse_prefix(name: &str) -> Option<SortKey> {
    let prefix = name.split('-').next()?;
    if prefix.len() != PREFIX_LEN || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(prefix, PREFIX_FORMAT)
        .ok()
        .map(|naive| SortKey(naive.and_utc()))
}

/// Parse a full `<prefix>-<suffix><ext>` filename into its key.
///
/// Unlike [`parse_prefix`], the 9-digit suffix must be present and is taken
/// as the fraction.
pub fn parse_file_name(name: &str) -> Option<SortKey> {
    let key = parse_prefix(name)?;
    let suffix = name.get(PREFIX_LEN + 1..PREFIX_LEN + 1 + SUFFIX_LEN)?;
    if !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let rest = &name[PREFIX_LEN + 1 + SUFFIX_LEN..];
    if !(rest.is_empty() || rest.starts_with('.')) {
        return None;
    }
    key.with_fraction(suffix.parse().ok()?)
}

/// Extension of a filename including the leading dot, or `""`.
pub fn extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}
