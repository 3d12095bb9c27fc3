//! Search-path resolution of logical names to files on disk.

use std::path::{Path, PathBuf};

/// Maps a logical name plus a set of recognized extensions to a file.
pub trait SearchTrail: Send + Sync {
    /// Finds the file for `logical_path`, trying each search path in order.
    fn find(&self, logical_path: &str, extensions: &[String]) -> Option<PathBuf>;
}

/// A [`SearchTrail`] over an ordered list of filesystem directories.
///
/// For each search path, an exact match wins; otherwise the first file (in
/// name order) whose name is the requested name followed only by recognized
/// extensions matches, so `app.js` finds `app.js.coffee` and `app` finds
/// `app.js`.
#[derive(Debug, Clone)]
pub struct FsTrail {
    paths: Vec<PathBuf>,
}

impl FsTrail {
    /// Creates a trail over `paths`, highest priority first.
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// The search paths.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn find_in(root: &Path, logical_path: &str, extensions: &[String]) -> Option<PathBuf> {
        let candidate = root.join(logical_path);
        if candidate.is_file() {
            return Some(candidate);
        }

        let dir = candidate.parent()?;
        let base = candidate.file_name()?.to_str()?;
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| {
                name.strip_prefix(base)
                    .is_some_and(|rest| is_extension_chain(rest, extensions))
            })
            .collect();
        names.sort();
        names
            .into_iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }
}

impl SearchTrail for FsTrail {
    fn find(&self, logical_path: &str, extensions: &[String]) -> Option<PathBuf> {
        if logical_path.is_empty() {
            return None;
        }
        self.paths
            .iter()
            .find_map(|root| Self::find_in(root, logical_path, extensions))
    }
}

/// Returns `true` if `rest` is a non-empty run of recognized extensions,
/// e.g. `".coffee.erb"`.
fn is_extension_chain(rest: &str, extensions: &[String]) -> bool {
    let Some(tail) = rest.strip_prefix('.') else {
        return false;
    };
    tail.split('.').all(|part| {
        !part.is_empty() && extensions.iter().any(|ext| ext.strip_prefix('.') == Some(part))
    })
}
