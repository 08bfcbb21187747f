//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every image leads with its position in the gallery and its current
//! filename; the content hash and ordering key follow as indented context
//! lines. The position is what a user sees in the gallery, the filename is
//! what they see in a file manager, so both come first.
//!
//! # Output Format
//!
//! ## Listing
//!
//! ```text
//! 001 20240101000000-249318877.jpg
//!     Id: 3a7bd3e2360a3d29eea436fcfb7e44c735d117c42d1c1835420b6b9942dd4f1b
//!     Timestamp: 2024-01-01T00:00:00.249318877Z (store)
//! 002 IMG_0001.jpg
//!     Id: 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
//!     Timestamp: 2019-07-04T18:30:15Z (exif)
//!
//! 2 images
//! ```
//!
//! ## Reorder
//!
//! ```text
//! Moved 20240101000005-713000042.jpg (gap)
//!     Id: 3a7bd3e2...
//!     Timestamp: 2024-01-01T00:00:05.713000042Z
//!     Renamed: 20240101000020-000000000.jpg → 20240101000005-713000042.jpg
//! ```
//!
//! # Architecture
//!
//! Each result type has a `format_*` function (returns `Vec<String>`) for
//! testability; [`print_lines`] writes them to stdout. Format functions are
//! pure: no I/O, no side effects.

use crate::events::{ChangeEvent, ChangeKind};
use crate::import::Imported;
use crate::migrate::MigrationReport;
use crate::reorder::{Rename, ReorderOutcome, Respaced, Tier};
use crate::scan::{DirEntry, Image};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 image`, `3 images`.
fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

fn tier_label(tier: Tier) -> &'static str {
    match tier {
        Tier::Gap => "gap",
        Tier::SameSecond => "same second",
        Tier::GroupRespace => "group respace",
    }
}

fn rename_line(depth: usize, rename: &Rename) -> String {
    format!("{}Renamed: {} → {}", indent(depth), rename.from, rename.to)
}

// ============================================================================
// Listing
// ============================================================================

pub fn format_listing(images: &[Image]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, image) in images.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), image.filename));
        lines.push(format!("{}Id: {}", indent(1), image.id));
        lines.push(format!(
            "{}Timestamp: {} ({})",
            indent(1),
            image.timestamp,
            image.source.as_str()
        ));
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(plural(images.len(), "image"));
    lines
}

pub fn format_dirs(dirs: &[DirEntry]) -> Vec<String> {
    if dirs.is_empty() {
        return vec!["No folders".to_string()];
    }
    dirs.iter()
        .map(|d| {
            let mut line = format!("{}/ ({}", d.name, plural(d.image_count, "image"));
            if d.dir_count > 0 {
                line.push_str(&format!(", {}", plural(d.dir_count, "folder")));
            }
            line.push(')');
            line
        })
        .collect()
}

// ============================================================================
// Mutations
// ============================================================================

pub fn format_reorder(outcome: &ReorderOutcome) -> Vec<String> {
    let mut lines = vec![
        format!("Moved {} ({})", outcome.filename, tier_label(outcome.tier)),
        format!("{}Id: {}", indent(1), outcome.id),
        format!("{}Timestamp: {}", indent(1), outcome.timestamp),
    ];
    lines.extend(outcome.renamed.iter().map(|r| rename_line(1, r)));
    lines
}

pub fn format_respaced(respaced: &Respaced) -> Vec<String> {
    let mut lines = vec![format!(
        "Respaced {}, renamed {}",
        plural(respaced.count, "image"),
        respaced.renamed.len()
    )];
    lines.extend(respaced.renamed.iter().map(|r| rename_line(1, r)));
    lines
}

pub fn format_imported(imported: &[Imported]) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in imported {
        lines.push(format!("{} → {}", entry.source.display(), entry.filename));
        lines.push(format!("{}Id: {}", indent(1), entry.id));
    }
    lines.push(format!("Imported {}", plural(imported.len(), "image")));
    lines
}

pub fn format_migration(report: Option<&MigrationReport>) -> Vec<String> {
    let Some(report) = report else {
        return vec!["Nothing to migrate".to_string()];
    };
    let mut lines = vec![format!("Migrated {}", plural(report.migrated, "timestamp"))];
    for name in &report.skipped {
        lines.push(format!("{}Skipped (no image): {}", indent(1), name));
    }
    lines
}

pub fn format_dialog(entries: &[String]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["(no dialog)".to_string()];
    }
    entries.to_vec()
}

pub fn format_change_event(event: &ChangeEvent) -> String {
    let verb = match event.kind {
        ChangeKind::Created => "created",
        ChangeKind::Renamed => "renamed",
        ChangeKind::Removed => "removed",
    };
    format!("{verb}: {}", event.path.display())
}

/// Write formatted lines to stdout.
pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ContentHash;
    use crate::metadata::TimestampSource;
    use crate::naming::SortKey;
    use std::path::PathBuf;

    fn hash(c: char) -> ContentHash {
        c.to_string().repeat(64).parse().unwrap()
    }

    fn image(name: &str, ts: &str, source: TimestampSource) -> Image {
        Image {
            id: hash('a'),
            filename: name.to_string(),
            url: String::new(),
            timestamp: SortKey::parse_rfc3339(ts).unwrap(),
            source,
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "image"), "1 image");
        assert_eq!(plural(0, "image"), "0 images");
        assert_eq!(plural(2, "folder"), "2 folders");
    }

    // =========================================================================
    // Listing
    // =========================================================================

    #[test]
    fn listing_shows_position_and_context() {
        let lines = format_listing(&[
            image("b.jpg", "2024-01-01T00:00:00.5Z", TimestampSource::Store),
            image("a.jpg", "2024-01-01T00:00:01Z", TimestampSource::Exif),
        ]);
        assert_eq!(lines[0], "001 b.jpg");
        assert_eq!(lines[1], format!("    Id: {}", "a".repeat(64)));
        assert_eq!(lines[2], "    Timestamp: 2024-01-01T00:00:00.5Z (store)");
        assert_eq!(lines[3], "002 a.jpg");
        assert_eq!(lines[5], "    Timestamp: 2024-01-01T00:00:01Z (exif)");
        assert_eq!(lines.last().unwrap(), "2 images");
    }

    #[test]
    fn empty_listing() {
        assert_eq!(format_listing(&[]), vec!["0 images"]);
    }

    #[test]
    fn dirs_with_counts() {
        let lines = format_dirs(&[
            DirEntry {
                name: "trips".into(),
                image_count: 1,
                dir_count: 2,
            },
            DirEntry {
                name: "misc".into(),
                image_count: 3,
                dir_count: 0,
            },
        ]);
        assert_eq!(lines, vec!["trips/ (1 image, 2 folders)", "misc/ (3 images)"]);
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    #[test]
    fn reorder_lists_renames() {
        let outcome = ReorderOutcome {
            id: hash('b'),
            filename: "20240101000005-000000001.jpg".into(),
            timestamp: SortKey::parse_rfc3339("2024-01-01T00:00:05.000000001Z").unwrap(),
            tier: Tier::Gap,
            renamed: vec![Rename {
                from: "old.jpg".into(),
                to: "20240101000005-000000001.jpg".into(),
            }],
        };
        let lines = format_reorder(&outcome);
        assert_eq!(lines[0], "Moved 20240101000005-000000001.jpg (gap)");
        assert_eq!(lines[2], "    Timestamp: 2024-01-01T00:00:05.000000001Z");
        assert_eq!(lines[3], "    Renamed: old.jpg → 20240101000005-000000001.jpg");
    }

    #[test]
    fn migration_summary() {
        assert_eq!(format_migration(None), vec!["Nothing to migrate"]);
        let report = MigrationReport {
            migrated: 1,
            skipped: vec!["gone.jpg".into()],
        };
        assert_eq!(
            format_migration(Some(&report)),
            vec!["Migrated 1 timestamp", "    Skipped (no image): gone.jpg"]
        );
    }

    #[test]
    fn change_event_line() {
        let event = ChangeEvent {
            kind: ChangeKind::Removed,
            path: PathBuf::from("trips/a.jpg"),
        };
        assert_eq!(format_change_event(&event), "removed: trips/a.jpg");
    }
}
