//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use quire_engine::Registry;
use tempfile::TempDir;

/// Writes `files` below a fresh temporary directory.
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        write(dir.path(), name, contents);
    }
    dir
}

/// Writes one file, creating parent directories.
pub fn write(root: &Path, name: &str, contents: &str) -> PathBuf {
    let path = root.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

/// A registry whose only search path is `root`.
pub fn registry(root: &Path) -> Registry {
    let registry = Registry::new(root);
    registry.append_path(root);
    registry
}

/// Rewrites a file and moves its mtime well past the previous one, so the
/// change is visible regardless of filesystem timestamp resolution.
pub fn touch(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
    let later = SystemTime::now() + Duration::from_secs(30);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(later)
        .unwrap();
}

/// The source of `logical_path` as a string.
pub fn source_of(registry: &Registry, logical_path: &str) -> String {
    let asset = registry
        .find_asset(logical_path)
        .unwrap()
        .unwrap_or_else(|| panic!("no asset for {logical_path}"));
    String::from_utf8(asset.source().unwrap().into_owned()).unwrap()
}
