//! Single-file assets served as they are on disk.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use quire_common::{path_fingerprint, AssetDigest};

use crate::dependency::file_mtime;
use crate::error::AssetError;

/// A file served without bundling, e.g. an image or a precompiled output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAsset {
    logical_path: String,
    path: PathBuf,
    content_type: String,
    mtime: SystemTime,
    length: u64,
    digest: AssetDigest,
}

impl StaticAsset {
    /// Reads the metadata of `path` and computes its digest.
    ///
    /// A file name carrying a full-length fingerprint (`logo-<sha256>.png`)
    /// is trusted and the contents are not hashed.
    pub fn build(
        logical_path: impl Into<String>,
        path: &Path,
        content_type: impl Into<String>,
    ) -> Result<Self, AssetError> {
        let metadata = std::fs::metadata(path).map_err(|e| AssetError::from_io(path, e))?;
        let mtime = metadata
            .modified()
            .map_err(|e| AssetError::from_io(path, e))?;

        let digest = match fingerprint_digest(path) {
            Some(digest) => digest,
            None => {
                let bytes = std::fs::read(path).map_err(|e| AssetError::from_io(path, e))?;
                AssetDigest::of(&bytes)
            }
        };

        Ok(Self {
            logical_path: logical_path.into(),
            path: path.to_path_buf(),
            content_type: content_type.into(),
            mtime,
            length: metadata.len(),
            digest,
        })
    }

    /// The logical path the asset was requested under.
    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }

    /// The file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Modification time when the asset was built.
    pub fn mtime(&self) -> SystemTime {
        self.mtime
    }

    /// Size in bytes when the asset was built.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Content digest.
    pub fn digest(&self) -> AssetDigest {
        self.digest
    }

    /// Reads the current contents of the file.
    pub fn contents(&self) -> Result<Vec<u8>, AssetError> {
        std::fs::read(&self.path).map_err(|e| AssetError::from_io(&self.path, e))
    }

    /// Returns `true` if the file changed since the asset was built.
    ///
    /// Fingerprinted files are immutable by convention and never stale.
    pub fn is_stale(&self) -> bool {
        if fingerprint_digest(&self.path).is_some() {
            return false;
        }
        match file_mtime(&self.path) {
            Ok(mtime) => mtime != self.mtime,
            Err(_) => true,
        }
    }
}

fn fingerprint_digest(path: &Path) -> Option<AssetDigest> {
    let name = path.file_name()?.to_str()?;
    path_fingerprint(name)?.parse().ok()
}
