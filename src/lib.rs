//! # Gallery Order
//!
//! A content-addressed ordering store for photo galleries kept on a plain
//! filesystem. There is no database: a gallery is a directory of image files
//! plus a `metadata/` tree of small JSON files, and every request re-reads
//! both.
//!
//! # Architecture: Identity, Key, Listing
//!
//! ```text
//! bytes      →  ContentHash   (SHA-256, the durable identity)
//! hash       →  SortKey       (stored entry, or a fallback chain)
//! directory  →  [Image]       (deduplicated by hash, sorted by key)
//! ```
//!
//! A move between two neighbors computes a new key, writes it to the store
//! and renames the file so its name mirrors the key
//! (`20240102030405-250000000.jpg`). The store decides the order; filenames
//! are for humans browsing the folder.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`hash`] | Content hashing, [`hash::ContentHash`] and the tagged [`hash::ImageRef`] identifier |
//! | [`naming`] | [`naming::SortKey`] and the `YYYYMMDDHHMMSS-NNNNNNNNN.ext` filename convention |
//! | [`store`] | Sharded per-image timestamp and dialog entries under `metadata/` |
//! | [`migrate`] | One-time upgrade from the flat `metadata.json` file |
//! | [`metadata`] | Ordering key fallback chain: store, filename, EXIF, modification time |
//! | [`scan`] | Directory scan, parallel hashing, deduplication and the sorted listing |
//! | [`reorder`] | The three-tier move engine and whole-folder respacing |
//! | [`import`] | Copying new files in at the end of the current second |
//! | [`events`] | Non-blocking change notification fan-out |
//! | [`gallery`] | Logical sub-paths, image lookup and change events over all of the above |
//! | [`config`] | `config.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Hash, Not Filename
//!
//! Filenames change on every move. Keying stored data by content hash means a
//! rename never has to move metadata, and two copies of the same photo under
//! different names collapse into one gallery entry.
//!
//! ## Sharded Metadata
//!
//! Entries live in `metadata/<first two hex chars>/`, so no single directory
//! grows past a few hundred files even in large galleries.
//!
//! ## Best-Effort Renames
//!
//! A reorder may touch many files. A failed rename or store write is logged
//! and skipped rather than aborting halfway; the next move or respace
//! converges the folder again.

pub mod config;
pub mod events;
pub mod gallery;
pub mod hash;
pub mod import;
pub mod metadata;
pub mod migrate;
pub mod naming;
pub mod output;
pub mod reorder;
pub mod scan;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
