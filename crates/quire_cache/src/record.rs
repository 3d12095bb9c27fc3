//! Persisted bundle record files.
//!
//! Each record lives at `<cache_dir>/bundles/<key>.bundle` and is laid out as
//! the magic bytes `QUIR`, a bincode-encoded [`RecordHeader`] and the encoded
//! bundle record. The header names the source file and the environment
//! digest the record was built for, so a record left behind by another
//! configuration, or copied between source files, never reads as a match.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use quire_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Leading bytes of every record file.
pub const RECORD_MAGIC: [u8; 4] = *b"QUIR";

/// Layout version of the header and payload. Bump on incompatible changes.
pub const RECORD_FORMAT: u32 = 2;

const RECORD_SUBDIR: &str = "bundles";
const RECORD_EXT: &str = "bundle";
const PARTIAL_EXT: &str = "partial";

/// What a record file says about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Layout version, compared against [`RECORD_FORMAT`].
    pub format: u32,
    /// The bundle's root source file.
    pub source_path: PathBuf,
    /// Digest of the pipeline configuration the bundle was built under.
    pub environment_digest: String,
    /// Checksum of the payload that follows the header.
    pub checksum: ContentHash,
}

/// Why a record file could not be used. Every miss means "rebuild".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordMiss {
    /// The file is missing or unreadable.
    Unreadable,
    /// The file does not start with a record header.
    NotARecord,
    /// The record was written with another layout version.
    Format(u32),
    /// The record belongs to another source file.
    WrongSource(PathBuf),
    /// The record was built under another configuration.
    WrongEnvironment(String),
    /// The payload does not match the header's checksum.
    Checksum,
}

impl fmt::Display for RecordMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable => f.write_str("record file is unreadable"),
            Self::NotARecord => f.write_str("not a bundle record"),
            Self::Format(format) => write!(f, "record format {format}, expected {RECORD_FORMAT}"),
            Self::WrongSource(path) => write!(f, "record belongs to {}", path.display()),
            Self::WrongEnvironment(digest) => write!(f, "record built under environment {digest}"),
            Self::Checksum => f.write_str("record payload checksum mismatch"),
        }
    }
}

/// The directory of record files inside a cache.
pub struct RecordDir {
    dir: PathBuf,
}

impl RecordDir {
    /// The record directory of the cache rooted at `cache_dir`.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            dir: cache_dir.join(RECORD_SUBDIR),
        }
    }

    /// The file holding the record with `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{RECORD_EXT}"))
    }

    /// Writes `payload` as the record of `source_path` and returns its key.
    ///
    /// The key covers the source path, the environment and the payload, so
    /// rewriting an unchanged bundle reuses its file. The file is written
    /// under a temporary name and renamed into place.
    pub fn write(
        &self,
        source_path: &Path,
        environment_digest: &str,
        payload: &[u8],
    ) -> Result<String, CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| CacheError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let header = RecordHeader {
            format: RECORD_FORMAT,
            source_path: source_path.to_path_buf(),
            environment_digest: environment_digest.to_string(),
            checksum: ContentHash::from_bytes(payload),
        };
        let key = record_key(&header);
        let encoded = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Header {
                source_path: source_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut bytes = Vec::with_capacity(RECORD_MAGIC.len() + encoded.len() + payload.len());
        bytes.extend_from_slice(&RECORD_MAGIC);
        bytes.extend_from_slice(&encoded);
        bytes.extend_from_slice(payload);

        let path = self.path_for(&key);
        let partial = path.with_extension(PARTIAL_EXT);
        std::fs::write(&partial, &bytes).map_err(|source| CacheError::Write {
            path: partial.clone(),
            source,
        })?;
        std::fs::rename(&partial, &path).map_err(|source| CacheError::Write { path, source })?;
        Ok(key)
    }

    /// Reads the payload of record `key`, checking that it was written for
    /// `source_path` under `environment_digest` and is intact.
    pub fn read(
        &self,
        key: &str,
        source_path: &Path,
        environment_digest: &str,
    ) -> Result<Vec<u8>, RecordMiss> {
        let raw = std::fs::read(self.path_for(key)).map_err(|_| RecordMiss::Unreadable)?;
        let body = raw
            .strip_prefix(&RECORD_MAGIC[..])
            .ok_or(RecordMiss::NotARecord)?;
        let (header, header_len): (RecordHeader, usize) =
            bincode::serde::decode_from_slice(body, bincode::config::standard())
                .map_err(|_| RecordMiss::NotARecord)?;

        if header.format != RECORD_FORMAT {
            return Err(RecordMiss::Format(header.format));
        }
        if header.source_path != source_path {
            return Err(RecordMiss::WrongSource(header.source_path));
        }
        if header.environment_digest != environment_digest {
            return Err(RecordMiss::WrongEnvironment(header.environment_digest));
        }
        let payload = &body[header_len..];
        if ContentHash::from_bytes(payload) != header.checksum {
            return Err(RecordMiss::Checksum);
        }
        Ok(payload.to_vec())
    }

    /// Deletes every record file whose key is not in `live`, along with
    /// leftovers of interrupted writes. Returns the number of files deleted.
    pub fn retain(&self, live: &HashSet<&str>) -> Result<usize, CacheError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(CacheError::Scan {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry
                .map_err(|source| CacheError::Scan {
                    path: self.dir.clone(),
                    source,
                })?
                .path();
            let ext = path.extension().and_then(|e| e.to_str());
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let orphaned = match ext {
                Some(RECORD_EXT) => !live.contains(stem),
                Some(PARTIAL_EXT) => true,
                _ => false,
            };
            if orphaned {
                std::fs::remove_file(&path).map_err(|source| CacheError::Write {
                    path: path.clone(),
                    source,
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn record_key(header: &RecordHeader) -> String {
    let source = header.source_path.to_string_lossy();
    let checksum = header.checksum.to_string();
    ContentHash::from_parts([
        source.as_ref(),
        header.environment_digest.as_str(),
        checksum.as_str(),
    ])
    .to_string()
}
