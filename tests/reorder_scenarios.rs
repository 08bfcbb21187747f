//! End-to-end ordering properties, driven through the public `Gallery` API.
//!
//! Each test builds a throwaway gallery in a temp directory, performs moves
//! the way a drag-and-drop client would, and checks the listing afterwards.
//!
//! Run with: cargo test --test reorder_scenarios

use gallery_order::config::GalleryConfig;
use gallery_order::gallery::Gallery;
use gallery_order::hash::{ContentHash, ImageRef};
use gallery_order::naming::SortKey;
use gallery_order::reorder::Tier;
use gallery_order::scan::Image;
use gallery_order::store::{METADATA_DIR, load_timestamp, save_timestamp};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =========================================================================
// Helpers
// =========================================================================

fn gallery(tmp: &TempDir) -> Gallery {
    Gallery::new(tmp.path(), GalleryConfig::default())
}

/// Write `content` under `name` and pin its ordering key.
fn add(dir: &Path, name: &str, content: &str, timestamp: &str) -> ContentHash {
    fs::write(dir.join(name), content).unwrap();
    let image = ImageRef::filename(name);
    save_timestamp(dir, &image, timestamp).unwrap();
    image.resolve(dir).unwrap().unwrap()
}

fn key(s: &str) -> SortKey {
    SortKey::parse_rfc3339(s).unwrap()
}

fn ids(images: &[Image]) -> Vec<ContentHash> {
    images.iter().map(|i| i.id.clone()).collect()
}

fn key_of(images: &[Image], id: &ContentHash) -> SortKey {
    images
        .iter()
        .find(|i| &i.id == id)
        .map(|i| i.timestamp)
        .unwrap_or_else(|| panic!("{id} missing from listing"))
}

fn assert_sorted(images: &[Image]) {
    assert!(
        images.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
        "listing not sorted: {:?}",
        images.iter().map(|i| i.timestamp).collect::<Vec<_>>()
    );
}

fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    walkdir::WalkDir::new(dir.join(METADATA_DIR))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| (e.path().to_path_buf(), fs::read(e.path()).unwrap()))
        .collect()
}

// =========================================================================
// Listing invariants
// =========================================================================

#[test]
fn identical_content_is_one_image() {
    let tmp = TempDir::new().unwrap();
    for name in ["a.jpg", "b.jpeg", "c.png", "20240101000000-000000000.jpg"] {
        fs::write(tmp.path().join(name), "same pixels").unwrap();
    }
    fs::write(tmp.path().join("other.jpg"), "other pixels").unwrap();

    let images = gallery(&tmp).images("").unwrap();

    assert_eq!(images.len(), 2);
}

#[test]
fn mixed_sources_sort_together() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    add(dir, "stored.jpg", "s", "2024-03-01T00:00:00Z");
    fs::write(dir.join("20240201000000-000000000.jpg"), "f").unwrap();
    fs::write(dir.join("IMG_0001.jpg"), "m").unwrap();

    let images = gallery(&tmp).images("").unwrap();

    assert_eq!(images.len(), 3);
    assert_sorted(&images);
    assert_eq!(images[0].filename, "20240201000000-000000000.jpg");
}

#[test]
fn migration_twice_equals_once() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.jpg"), "a").unwrap();
    fs::write(dir.join("b.jpg"), "b").unwrap();
    fs::write(
        dir.join("metadata.json"),
        r#"{"a.jpg": "2024-01-02T00:00:00Z", "b.jpg": "2024-01-01T00:00:00.5Z"}"#,
    )
    .unwrap();
    let g = gallery(&tmp);

    let report = g.migrate("").unwrap().unwrap();
    let once = snapshot(dir);
    assert!(g.migrate("").unwrap().is_none());

    assert_eq!(report.migrated, 2);
    assert_eq!(snapshot(dir), once);
    assert!(!dir.join("metadata.json").exists());
}

#[test]
fn stored_string_round_trips_exactly() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.jpg"), "a").unwrap();
    let image = ImageRef::filename("a.jpg");

    for ts in [
        "2024-01-02T03:04:05Z",
        "2024-01-02T03:04:05.5Z",
        "2024-01-02T03:04:05.000000001Z",
        "2024-01-02T05:04:05.123456789+02:00",
    ] {
        save_timestamp(dir, &image, ts).unwrap();
        assert_eq!(load_timestamp(dir, &image).unwrap().as_deref(), Some(ts));
    }
}

// =========================================================================
// Moves
// =========================================================================

#[test]
fn widened_gap_places_at_midpoint() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    // Uploaded A, B, C one second apart, then C pushed out to ten seconds
    let a = add(dir, "a.jpg", "A", "2024-05-01T12:00:00Z");
    let b = add(dir, "b.jpg", "B", "2024-05-01T12:00:01Z");
    let c = add(dir, "c.jpg", "C", "2024-05-01T12:00:10Z");

    let outcome = gallery(&tmp)
        .reorder("", &ImageRef::Hash(b.clone()), Some(&ImageRef::Hash(a.clone())), Some(&ImageRef::Hash(c.clone())))
        .unwrap();

    assert_eq!(outcome.tier, Tier::Gap);
    assert_eq!(outcome.id, b);
    assert_eq!(outcome.timestamp.second(), key("2024-05-01T12:00:05Z").second());
    let images = gallery(&tmp).images("").unwrap();
    assert!(key_of(&images, &a) < outcome.timestamp);
    assert!(outcome.timestamp < key_of(&images, &c));
    assert_eq!(ids(&images), vec![a, b, c]);
}

#[test]
fn midpoint_strictly_between_for_many_gaps() {
    for gap in [2, 3, 7, 60, 86_400] {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let start = key("2024-01-01T00:00:00Z");
        let end = SortKey::at(start.second() + gap, 0).unwrap();
        let a = add(dir, "a.jpg", "a", &start.to_rfc3339());
        let c = add(dir, "c.jpg", "c", &end.to_rfc3339());
        let b = add(dir, "b.jpg", "b", "2030-01-01T00:00:00Z");

        let out = gallery(&tmp)
            .reorder("", &ImageRef::Hash(b), Some(&ImageRef::Hash(a)), Some(&ImageRef::Hash(c)))
            .unwrap();

        assert!(start < out.timestamp && out.timestamp < end, "gap {gap}");
    }
}

#[test]
fn boundary_moves_stay_monotonic() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let hashes: Vec<ContentHash> = (0..5)
        .map(|i| {
            add(
                dir,
                &format!("{i}.jpg"),
                &format!("img{i}"),
                &format!("2024-01-01T00:00:0{i}Z"),
            )
        })
        .collect();
    let g = gallery(&tmp);

    // First image to the end
    let last = hashes[4].clone();
    let out = g
        .reorder("", &ImageRef::Hash(hashes[0].clone()), Some(&ImageRef::Hash(last.clone())), None)
        .unwrap();
    let images = g.images("").unwrap();
    assert!(out.timestamp > key_of(&images, &last));
    assert_eq!(images.last().unwrap().id, hashes[0]);

    // Last image (now hashes[0]) back to the front
    let first = images[0].id.clone();
    let out = g
        .reorder("", &ImageRef::Hash(hashes[0].clone()), None, Some(&ImageRef::Hash(first.clone())))
        .unwrap();
    let images = g.images("").unwrap();
    assert!(out.timestamp < key_of(&images, &first));
    assert_eq!(ids(&images), hashes);
}

#[test]
fn crowded_second_keeps_relative_order() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    // Twenty images packed into consecutive nanoseconds of one second
    let packed: Vec<ContentHash> = (0..20)
        .map(|i| {
            add(
                dir,
                &format!("p{i:02}.jpg"),
                &format!("packed {i}"),
                &format!("2024-01-01T00:00:00.{:09}Z", i + 1),
            )
        })
        .collect();
    let moved = add(dir, "moved.jpg", "moved", "2024-01-01T00:00:09Z");
    let g = gallery(&tmp);

    let out = g
        .reorder(
            "",
            &ImageRef::Hash(moved.clone()),
            Some(&ImageRef::Hash(packed[9].clone())),
            Some(&ImageRef::Hash(packed[10].clone())),
        )
        .unwrap();

    assert_eq!(out.tier, Tier::GroupRespace);
    let images = g.images("").unwrap();
    assert_sorted(&images);
    let mut expected = packed.clone();
    expected.insert(10, moved);
    assert_eq!(ids(&images), expected);
    // Respaced keys are no longer crowded
    for pair in images.windows(2) {
        assert!(pair[1].timestamp.fraction() - pair[0].timestamp.fraction() > 1);
    }
}

#[test]
fn many_moves_keep_a_consistent_gallery() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let mut order: Vec<ContentHash> = (0..8)
        .map(|i| {
            add(
                dir,
                &format!("{i}.jpg"),
                &format!("img{i}"),
                &format!("2024-01-01T00:00:0{i}Z"),
            )
        })
        .collect();
    let g = gallery(&tmp);

    // (from index, to index) in the current order
    for (from, to) in [(0usize, 7usize), (7, 0), (3, 4), (5, 1), (2, 6), (6, 2), (1, 1), (4, 0)] {
        let moved = order.remove(from);
        let prev = to.checked_sub(1).map(|i| order[i].clone());
        let next = order.get(to).cloned();
        order.insert(to, moved.clone());

        g.reorder(
            "",
            &ImageRef::Hash(moved),
            prev.map(ImageRef::Hash).as_ref(),
            next.map(ImageRef::Hash).as_ref(),
        )
        .unwrap();

        let images = g.images("").unwrap();
        assert_sorted(&images);
        assert_eq!(ids(&images), order, "after moving {from} -> {to}");
    }
    // Every listed file exists and nothing was duplicated or lost
    let images = g.images("").unwrap();
    assert_eq!(images.len(), 8);
    assert!(images.iter().all(|i| dir.join(&i.filename).is_file()));
}

#[test]
fn respace_preserves_order() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    for i in 0..6 {
        add(
            dir,
            &format!("{i}.jpg"),
            &format!("img{i}"),
            &format!("2024-01-01T00:00:00.00000000{i}Z"),
        );
    }
    add(dir, "late.jpg", "late", "2024-01-01T00:00:30Z");
    let g = gallery(&tmp);
    let before = ids(&g.images("").unwrap());

    let respaced = g.respace("").unwrap();

    assert_eq!(respaced.count, 7);
    let images = g.images("").unwrap();
    assert_eq!(ids(&images), before);
    assert_eq!(images[6].timestamp.second() - images[0].timestamp.second(), 30);
}
