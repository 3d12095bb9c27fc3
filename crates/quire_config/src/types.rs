//! Configuration types deserialized from `quire.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level pipeline configuration parsed from `quire.toml`.
#[derive(Debug, Deserialize)]
pub struct QuireConfig {
    /// Project metadata (name, root directory).
    pub project: ProjectMeta,
    /// Search paths and output locations.
    pub paths: PathConfig,
    /// Extension handling.
    #[serde(default)]
    pub extensions: ExtensionConfig,
    /// MIME type overrides keyed by extension (e.g. `".coffee"`).
    #[serde(default)]
    pub mime_types: BTreeMap<String, String>,
}

/// Core project metadata.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// Root directory that relative paths are resolved against, relative to
    /// the directory holding `quire.toml`.
    #[serde(default = "default_root")]
    pub root: String,
}

fn default_root() -> String {
    ".".to_string()
}

/// Where assets are searched for and where derived output lives.
#[derive(Debug, Deserialize)]
pub struct PathConfig {
    /// Ordered asset search paths. Earlier entries win.
    pub search: Vec<String>,
    /// Directory of already-precompiled assets served before the search paths.
    #[serde(default)]
    pub static_root: Option<String>,
    /// Directory for the persistent bundle cache.
    #[serde(default)]
    pub cache_dir: Option<String>,
}

/// Extension handling.
#[derive(Debug, Deserialize)]
pub struct ExtensionConfig {
    /// Extra extensions the search trail recognizes beyond the
    /// concatenatable ones and the registered engine extensions.
    #[serde(default)]
    pub recognized: Vec<String>,
    /// Format extensions whose files are bundled rather than served as-is.
    #[serde(default = "default_concatenatable")]
    pub concatenatable: Vec<String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            recognized: Vec::new(),
            concatenatable: default_concatenatable(),
        }
    }
}

fn default_concatenatable() -> Vec<String> {
    vec![".js".to_string(), ".css".to_string()]
}
