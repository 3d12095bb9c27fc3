//! Cache manifest tracking which encoded bundle belongs to which source file.
//!
//! The manifest is stored as `manifest.json` in the cache directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Name of the manifest file within the cache directory.
const MANIFEST_FILE: &str = "manifest.json";

/// Top-level cache manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Quire version that produced this cache. Invalidate on version change.
    pub quire_version: String,

    /// Encoded bundles keyed by resolved source path.
    pub bundles: HashMap<PathBuf, BundleEntry>,
}

/// Cached state for a single bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    /// Logical path the bundle was built for.
    pub logical_path: String,

    /// Key of the record file in the `bundles` directory.
    pub record_key: String,

    /// Digest of the pipeline configuration the bundle was built under.
    pub environment_digest: String,
}

impl CacheManifest {
    /// Creates a new, empty cache manifest for the given Quire version.
    pub fn new(quire_version: &str) -> Self {
        Self {
            quire_version: quire_version.to_string(),
            bundles: HashMap::new(),
        }
    }

    /// Loads the manifest from the cache directory, returning `None` if
    /// the file doesn't exist or can't be parsed.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let path = cache_dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Saves the manifest to the cache directory, creating it if needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(|source| CacheError::Write {
            path: cache_dir.to_path_buf(),
            source,
        })?;
        let path = cache_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Manifest {
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|source| CacheError::Write { path, source })
    }

    /// Returns `true` if this manifest was produced by a compatible Quire version.
    pub fn is_compatible(&self, current_version: &str) -> bool {
        self.quire_version == current_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str) -> BundleEntry {
        BundleEntry {
            logical_path: "app.js".to_string(),
            record_key: key.to_string(),
            environment_digest: "env1".to_string(),
        }
    }

    #[test]
    fn new_manifest_is_empty() {
        let m = CacheManifest::new("0.1.0");
        assert_eq!(m.quire_version, "0.1.0");
        assert!(m.bundles.is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = CacheManifest::new("0.1.0");
        m.bundles
            .insert(PathBuf::from("/srv/assets/app.js"), entry("abc123"));
        m.save(dir.path()).unwrap();

        let loaded = CacheManifest::load(dir.path()).unwrap();
        assert_eq!(loaded.quire_version, "0.1.0");
        assert_eq!(
            loaded.bundles[&PathBuf::from("/srv/assets/app.js")],
            entry("abc123")
        );
    }

    #[test]
    fn load_nonexistent_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CacheManifest::load(dir.path()).is_none());
    }

    #[test]
    fn load_corrupt_json_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("manifest.json"), "not valid json {{{").unwrap();
        assert!(CacheManifest::load(dir.path()).is_none());
    }

    #[test]
    fn compatibility_is_exact_version_match() {
        let m = CacheManifest::new("0.1.0");
        assert!(m.is_compatible("0.1.0"));
        assert!(!m.is_compatible("0.2.0"));
    }

    #[test]
    fn save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deeply").join("nested").join("cache");
        CacheManifest::new("0.1.0").save(&nested).unwrap();
        assert!(nested.join("manifest.json").exists());
    }
}
