//! The asset type handed out by [`Registry::find_asset`](crate::Registry::find_asset).

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use quire_common::AssetDigest;

use crate::bundled_asset::{BundledAsset, ProcessedAsset};
use crate::error::AssetError;
use crate::static_asset::StaticAsset;

/// A built asset, either a single file or a bundle.
///
/// Cloning is cheap; clones share the underlying build.
#[derive(Debug, Clone)]
pub enum Asset {
    /// A file served as is.
    Static(Arc<StaticAsset>),
    /// A concatenated bundle.
    Bundled(Arc<BundledAsset>),
}

impl Asset {
    /// The logical path the asset was requested under.
    pub fn logical_path(&self) -> &str {
        match self {
            Asset::Static(a) => a.logical_path(),
            Asset::Bundled(a) => a.logical_path(),
        }
    }

    /// The root file on disk.
    pub fn path(&self) -> &Path {
        match self {
            Asset::Static(a) => a.path(),
            Asset::Bundled(a) => a.path(),
        }
    }

    /// The content type.
    pub fn content_type(&self) -> &str {
        match self {
            Asset::Static(a) => a.content_type(),
            Asset::Bundled(a) => a.content_type(),
        }
    }

    /// Modification time of the newest input.
    pub fn mtime(&self) -> SystemTime {
        match self {
            Asset::Static(a) => a.mtime(),
            Asset::Bundled(a) => a.mtime(),
        }
    }

    /// Content digest of the output.
    pub fn digest(&self) -> Result<AssetDigest, AssetError> {
        match self {
            Asset::Static(a) => Ok(a.digest()),
            Asset::Bundled(a) => a.digest(),
        }
    }

    /// Length of the output in bytes.
    pub fn length(&self) -> Result<u64, AssetError> {
        match self {
            Asset::Static(a) => Ok(a.length()),
            Asset::Bundled(a) => a.length(),
        }
    }

    /// The output bytes. Bundles borrow their cached source; static files
    /// are read from disk.
    pub fn source(&self) -> Result<Cow<'_, [u8]>, AssetError> {
        match self {
            Asset::Static(a) => Ok(Cow::Owned(a.contents()?)),
            Asset::Bundled(a) => Ok(Cow::Borrowed(a.source()?.as_bytes())),
        }
    }

    /// The required parts of a bundle, without the root file. Empty for
    /// static assets.
    pub fn dependencies(&self) -> Vec<&Arc<ProcessedAsset>> {
        match self {
            Asset::Static(_) => Vec::new(),
            Asset::Bundled(a) => a.dependencies(),
        }
    }

    /// Returns `true` if the asset must be rebuilt.
    pub fn is_stale(&self) -> bool {
        match self {
            Asset::Static(a) => a.is_stale(),
            Asset::Bundled(a) => a.is_stale(),
        }
    }

    /// The bundle, if this is one.
    pub fn as_bundled(&self) -> Option<&Arc<BundledAsset>> {
        match self {
            Asset::Bundled(a) => Some(a),
            Asset::Static(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_asset_accessors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("robots.txt");
        std::fs::write(&path, "User-agent: *").unwrap();
        let asset = Asset::Static(Arc::new(
            StaticAsset::build("robots.txt", &path, "text/plain").unwrap(),
        ));

        assert_eq!(asset.logical_path(), "robots.txt");
        assert_eq!(asset.content_type(), "text/plain");
        assert_eq!(asset.length().unwrap(), 13);
        assert_eq!(asset.source().unwrap().as_ref(), b"User-agent: *");
        assert_eq!(asset.digest().unwrap(), AssetDigest::of(b"User-agent: *"));
        assert!(asset.dependencies().is_empty());
        assert!(asset.as_bundled().is_none());
        assert!(!asset.is_stale());
    }
}
