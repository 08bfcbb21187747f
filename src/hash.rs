//! Content hashing and image identifiers.
//!
//! Every image is identified by the SHA-256 of its bytes, never by its
//! filename. Filenames change on every reorder; the digest only changes when
//! the pixels do. This makes the hash the durable key for everything stored
//! about an image (ordering timestamp, dialog lines).
//!
//! ## Identifiers
//!
//! Callers refer to an image either by its digest or by its current filename.
//! [`ImageRef`] keeps the two apart explicitly. A filename that happens to be
//! 64 hex characters is still a filename, so there is no guessing based on
//! string shape inside the library.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("not a content hash: {0:?}")]
pub struct InvalidHash(pub String);

/// Hex-encoded SHA-256 digest of an image file. Always lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Two-character shard directory name.
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContentHash {
    type Err = InvalidHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == HASH_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(InvalidHash(s.to_string()))
        }
    }
}

impl TryFrom<String> for ContentHash {
    type Error = InvalidHash;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reference to an image inside a gallery directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// The image whose bytes hash to this digest.
    Hash(ContentHash),
    /// The image currently stored under this filename (no directory part).
    Filename(String),
}

impl ImageRef {
    pub fn filename(name: impl Into<String>) -> Self {
        Self::Filename(name.into())
    }

    /// Resolve to a content hash, hashing the named file when needed.
    ///
    /// A filename whose file no longer exists resolves to `None`: a deleted
    /// image cannot be hashed, and callers treat that as "no entry".
    pub fn resolve(&self, dir: &Path) -> io::Result<Option<ContentHash>> {
        match self {
            Self::Hash(hash) => Ok(Some(hash.clone())),
            Self::Filename(name) => match hash_file(&dir.join(name)) {
                Ok(hash) => Ok(Some(hash)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e),
            },
        }
    }
}

impl From<ContentHash> for ImageRef {
    fn from(hash: ContentHash) -> Self {
        Self::Hash(hash)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash(hash) => write!(f, "{hash}"),
            Self::Filename(name) => f.write_str(name),
        }
    }
}

/// SHA-256 of a file's contents, streamed rather than read into memory.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// SHA-256 of a string, used by the legacy filename-keyed dialog layout.
pub fn hash_name(name: &str) -> String {
    format!("{:x}", Sha256::digest(name.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn hash_file_deterministic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        fs::write(&path, b"hello world").unwrap();

        let h1 = hash_file(&path).unwrap();
        let h2 = hash_file(&path).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.as_str().len(), HASH_HEX_LEN);
    }

    #[test]
    fn hash_file_known_digest() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            hash_file(&path).unwrap().as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hash_file_changes_with_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        fs::write(&path, b"version 1").unwrap();
        let h1 = hash_file(&path).unwrap();
        fs::write(&path, b"version 2").unwrap();
        assert_ne!(h1, hash_file(&path).unwrap());
    }

    #[test]
    fn hash_file_ignores_name() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("one.jpg"), b"same").unwrap();
        fs::write(tmp.path().join("two.png"), b"same").unwrap();
        assert_eq!(
            hash_file(&tmp.path().join("one.jpg")).unwrap(),
            hash_file(&tmp.path().join("two.png")).unwrap()
        );
    }

    #[test]
    fn hash_file_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = hash_file(&tmp.path().join("gone.jpg")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn content_hash_parse_normalises_case() {
        let upper = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";
        let hash: ContentHash = upper.parse().unwrap();
        assert_eq!(hash.as_str(), upper.to_ascii_lowercase());
        assert_eq!(hash.shard(), "ba");
    }

    #[test]
    fn content_hash_rejects_wrong_shape() {
        assert!("abc".parse::<ContentHash>().is_err());
        assert!("z".repeat(64).parse::<ContentHash>().is_err());
        assert!("a".repeat(65).parse::<ContentHash>().is_err());
    }

    #[test]
    fn content_hash_serde_as_string() {
        let hash: ContentHash = "a".repeat(64).parse().unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "a".repeat(64)));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
        assert!(serde_json::from_str::<ContentHash>("\"nope\"").is_err());
    }

    #[test]
    fn resolve_filename_hashes_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("x.jpg"), b"pixels").unwrap();
        let resolved = ImageRef::filename("x.jpg").resolve(tmp.path()).unwrap();
        assert_eq!(resolved, Some(hash_file(&tmp.path().join("x.jpg")).unwrap()));
    }

    #[test]
    fn resolve_missing_filename_is_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(ImageRef::filename("x.jpg").resolve(tmp.path()).unwrap(), None);
    }

    #[test]
    fn hex_looking_filename_stays_a_filename() {
        let tmp = TempDir::new().unwrap();
        let name = "c".repeat(64);
        fs::write(tmp.path().join(&name), b"pixels").unwrap();
        let resolved = ImageRef::filename(name.clone())
            .resolve(tmp.path())
            .unwrap()
            .unwrap();
        assert_ne!(resolved.as_str(), name);
    }

    #[test]
    fn hash_name_is_sha256_of_string() {
        assert_eq!(
            hash_name("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
