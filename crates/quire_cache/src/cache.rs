//! High-level bundle cache.
//!
//! [`BundleCache`] ties the manifest and the record directory together:
//! encoded bundles are written as record files and indexed in the manifest
//! by source path along with the environment digest they were built under.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::CacheError;
use crate::manifest::{BundleEntry, CacheManifest};
use crate::record::RecordDir;

/// On-disk cache of encoded bundles.
///
/// All reads are fail-safe: corruption, version mismatches and environment
/// mismatches result in cache misses rather than errors.
pub struct BundleCache {
    cache_dir: PathBuf,
    manifest: CacheManifest,
    records: RecordDir,
}

impl BundleCache {
    /// Loads an existing cache or creates a fresh one.
    ///
    /// A manifest written by a different Quire version is discarded.
    pub fn load_or_create(cache_dir: &Path, quire_version: &str) -> Self {
        let manifest = match CacheManifest::load(cache_dir) {
            Some(manifest) if manifest.is_compatible(quire_version) => manifest,
            Some(manifest) => {
                warn!(
                    cache_dir = %cache_dir.display(),
                    found = %manifest.quire_version,
                    expected = quire_version,
                    "discarding bundle cache written by another version"
                );
                CacheManifest::new(quire_version)
            }
            None => CacheManifest::new(quire_version),
        };

        Self {
            cache_dir: cache_dir.to_path_buf(),
            manifest,
            records: RecordDir::new(cache_dir),
        }
    }

    /// Returns the directory this cache lives in.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Stores an encoded bundle for a source path and returns its record key.
    pub fn store_bundle(
        &mut self,
        path: &Path,
        logical_path: &str,
        environment_digest: &str,
        record: &[u8],
    ) -> Result<String, CacheError> {
        let key = self.records.write(path, environment_digest, record)?;
        self.manifest.bundles.insert(
            path.to_path_buf(),
            BundleEntry {
                logical_path: logical_path.to_string(),
                record_key: key.clone(),
                environment_digest: environment_digest.to_string(),
            },
        );
        Ok(key)
    }

    /// Loads the encoded bundle for a source path.
    ///
    /// Returns `None` if nothing is cached for the path, the entry was built
    /// under a different environment digest, or the record file fails
    /// validation.
    pub fn load_bundle(&self, path: &Path, environment_digest: &str) -> Option<Vec<u8>> {
        let entry = self.manifest.bundles.get(path)?;
        if entry.environment_digest != environment_digest {
            return None;
        }
        match self.records.read(&entry.record_key, path, environment_digest) {
            Ok(record) => Some(record),
            Err(miss) => {
                debug!(path = %path.display(), %miss, "ignoring persisted record");
                None
            }
        }
    }

    /// Drops manifest entries for the given source paths.
    pub fn remove(&mut self, paths: &[PathBuf]) {
        for path in paths {
            self.manifest.bundles.remove(path);
        }
    }

    /// Persists the current manifest to disk.
    pub fn save(&self) -> Result<(), CacheError> {
        self.manifest.save(&self.cache_dir)
    }

    /// Returns a reference to the current cache manifest.
    pub fn manifest(&self) -> &CacheManifest {
        &self.manifest
    }

    /// Removes record files not referenced by the manifest.
    ///
    /// Returns the number of files removed.
    pub fn gc(&self) -> Result<usize, CacheError> {
        let live: HashSet<&str> = self
            .manifest
            .bundles
            .values()
            .map(|e| e.record_key.as_str())
            .collect();
        let removed = self.records.retain(&live)?;
        if removed > 0 {
            debug!(cache_dir = %self.cache_dir.display(), removed, "removed orphaned bundle records");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cache() -> (tempfile::TempDir, BundleCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = BundleCache::load_or_create(dir.path(), "0.1.0");
        (dir, cache)
    }

    #[test]
    fn fresh_cache_has_empty_manifest() {
        let (_dir, cache) = make_cache();
        assert!(cache.manifest().bundles.is_empty());
        assert_eq!(cache.manifest().quire_version, "0.1.0");
    }

    #[test]
    fn store_and_load_bundle() {
        let (_dir, mut cache) = make_cache();
        let path = Path::new("/srv/assets/app.js");
        cache
            .store_bundle(path, "app.js", "env1", b"record bytes")
            .unwrap();

        assert_eq!(cache.load_bundle(path, "env1").unwrap(), b"record bytes");
    }

    #[test]
    fn environment_mismatch_is_a_miss() {
        let (_dir, mut cache) = make_cache();
        let path = Path::new("/srv/assets/app.js");
        cache.store_bundle(path, "app.js", "env1", b"record").unwrap();
        assert!(cache.load_bundle(path, "env2").is_none());
    }

    #[test]
    fn load_unknown_path_is_a_miss() {
        let (_dir, cache) = make_cache();
        assert!(cache.load_bundle(Path::new("nope.js"), "env1").is_none());
    }

    #[test]
    fn reload_persisted_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = Path::new("/srv/assets/app.js");
        {
            let mut cache = BundleCache::load_or_create(dir.path(), "0.1.0");
            cache.store_bundle(path, "app.js", "env1", b"record").unwrap();
            cache.save().unwrap();
        }

        let cache = BundleCache::load_or_create(dir.path(), "0.1.0");
        assert_eq!(cache.manifest().bundles.len(), 1);
        assert_eq!(cache.load_bundle(path, "env1").unwrap(), b"record");
    }

    #[test]
    fn version_mismatch_creates_fresh_cache() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut cache = BundleCache::load_or_create(dir.path(), "0.1.0");
            cache
                .store_bundle(Path::new("app.js"), "app.js", "env1", b"record")
                .unwrap();
            cache.save().unwrap();
        }

        let cache = BundleCache::load_or_create(dir.path(), "0.2.0");
        assert!(cache.manifest().bundles.is_empty());
        assert_eq!(cache.manifest().quire_version, "0.2.0");
    }

    #[test]
    fn gc_removes_replaced_records() {
        let (_dir, mut cache) = make_cache();
        let path = Path::new("app.js");
        cache.store_bundle(path, "app.js", "env1", b"first").unwrap();
        cache.store_bundle(path, "app.js", "env1", b"second").unwrap();

        assert_eq!(cache.gc().unwrap(), 1);
        assert_eq!(cache.load_bundle(path, "env1").unwrap(), b"second");
    }

    #[test]
    fn record_swapped_between_sources_is_a_miss() {
        let (dir, mut cache) = make_cache();
        let a = Path::new("/srv/assets/a.js");
        let b = Path::new("/srv/assets/b.js");
        let key_a = cache.store_bundle(a, "a.js", "env1", b"A").unwrap();
        let key_b = cache.store_bundle(b, "b.js", "env1", b"B").unwrap();

        let records = dir.path().join("bundles");
        std::fs::copy(
            records.join(format!("{key_a}.bundle")),
            records.join(format!("{key_b}.bundle")),
        )
        .unwrap();
        assert!(cache.load_bundle(b, "env1").is_none());
        assert_eq!(cache.load_bundle(a, "env1").unwrap(), b"A");
    }

    #[test]
    fn remove_drops_entries() {
        let (_dir, mut cache) = make_cache();
        let path = PathBuf::from("gone.js");
        cache.store_bundle(&path, "gone.js", "env1", b"x").unwrap();
        cache.remove(&[path.clone()]);
        assert!(cache.load_bundle(&path, "env1").is_none());
    }
}
