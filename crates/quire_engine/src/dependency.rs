//! Dependency records and the dependency sets used for freshness checks.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::AssetError;

/// Returns the modification time of a file.
pub(crate) fn file_mtime(path: &Path) -> std::io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}

/// One filesystem input of a build, captured at a point in time.
///
/// Records compare and hash by path only: two captures of the same file are
/// interchangeable regardless of when they were taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRecord {
    path: PathBuf,
    mtime: SystemTime,
}

impl DependencyRecord {
    /// Creates a record from a known path and modification time.
    pub fn new(path: impl Into<PathBuf>, mtime: SystemTime) -> Self {
        Self {
            path: path.into(),
            mtime,
        }
    }

    /// Captures the current modification time of `path`.
    pub fn capture(path: &Path) -> Result<Self, AssetError> {
        let mtime = file_mtime(path).map_err(|e| AssetError::from_io(path, e))?;
        Ok(Self::new(path, mtime))
    }

    /// The recorded file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The modification time at capture.
    pub fn mtime(&self) -> SystemTime {
        self.mtime
    }

    /// Returns `true` if the file is gone or its modification time no longer
    /// matches the recorded one.
    pub fn is_stale(&self) -> bool {
        match file_mtime(&self.path) {
            Ok(current) => current != self.mtime,
            Err(_) => true,
        }
    }
}

impl PartialEq for DependencyRecord {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for DependencyRecord {}

impl Hash for DependencyRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// A set of dependency records keyed by path.
///
/// When the same path is inserted twice, the later capture wins; captures
/// taken within one snapshot agree, so the choice does not matter there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    records: BTreeMap<PathBuf, SystemTime>,
}

impl DependencySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record.
    pub fn insert(&mut self, record: DependencyRecord) {
        self.records.insert(record.path, record.mtime);
    }

    /// Adds every record of `other`.
    pub fn merge(&mut self, other: &DependencySet) {
        for (path, mtime) in &other.records {
            self.records.insert(path.clone(), *mtime);
        }
    }

    /// Returns `true` if the set contains `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the set holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recent modification time in the set.
    pub fn latest_mtime(&self) -> Option<SystemTime> {
        self.records.values().copied().max()
    }

    /// Iterates the records in path order.
    pub fn records(&self) -> impl Iterator<Item = DependencyRecord> + '_ {
        self.records
            .iter()
            .map(|(path, mtime)| DependencyRecord::new(path.clone(), *mtime))
    }

    /// Returns `true` if any recorded file changed or disappeared.
    pub fn is_stale(&self) -> bool {
        self.records().any(|record| record.is_stale())
    }
}

impl FromIterator<DependencyRecord> for DependencySet {
    fn from_iter<I: IntoIterator<Item = DependencyRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}
