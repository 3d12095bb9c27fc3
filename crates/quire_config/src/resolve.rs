//! Environment resolution: anchoring configured paths and normalizing extensions.

use crate::types::QuireConfig;
use quire_common::normalize_extension;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A configuration with every path made absolute against the project
/// directory and every extension in dotted form.
#[derive(Debug, Clone)]
pub struct ResolvedEnvironment {
    /// The project name.
    pub name: String,
    /// The resolved project root.
    pub root: PathBuf,
    /// Search paths in priority order.
    pub search_paths: Vec<PathBuf>,
    /// Directory of precompiled assets, if configured.
    pub static_root: Option<PathBuf>,
    /// Directory for the persistent bundle cache, if configured.
    pub cache_dir: Option<PathBuf>,
    /// Extra recognized extensions.
    pub recognized_extensions: Vec<String>,
    /// Concatenatable format extensions.
    pub concatenatable_extensions: Vec<String>,
    /// MIME overrides keyed by normalized extension.
    pub mime_types: BTreeMap<String, String>,
}

/// Resolves a loaded configuration relative to the directory that holds
/// its `quire.toml`.
///
/// The project root is `project_dir/<project.root>`; search paths, the static
/// root and the cache directory are then resolved against that root. Absolute
/// paths are kept as they are.
pub fn resolve_environment(config: &QuireConfig, project_dir: &Path) -> ResolvedEnvironment {
    let root = anchor(project_dir, &config.project.root);
    let normalize = |exts: &[String]| -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(exts.len());
        for ext in exts.iter().map(|e| normalize_extension(e)) {
            if !out.contains(&ext) {
                out.push(ext);
            }
        }
        out
    };

    ResolvedEnvironment {
        name: config.project.name.clone(),
        search_paths: config
            .paths
            .search
            .iter()
            .map(|p| anchor(&root, p))
            .collect(),
        static_root: config.paths.static_root.as_deref().map(|p| anchor(&root, p)),
        cache_dir: config.paths.cache_dir.as_deref().map(|p| anchor(&root, p)),
        recognized_extensions: normalize(&config.extensions.recognized),
        concatenatable_extensions: normalize(&config.extensions.concatenatable),
        mime_types: config
            .mime_types
            .iter()
            .map(|(ext, mime)| (normalize_extension(ext), mime.clone()))
            .collect(),
        root,
    }
}

fn anchor(base: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else if path == "." {
        base.to_path_buf()
    } else {
        base.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn resolves_paths_against_root() {
        let toml = r#"
[project]
name = "site"
root = "frontend"

[paths]
search = ["assets/js", "/opt/shared/assets"]
static_root = "public/assets"
"#;
        let config = load_config_from_str(toml).unwrap();
        let env = resolve_environment(&config, Path::new("/srv/app"));
        assert_eq!(env.root, PathBuf::from("/srv/app/frontend"));
        assert_eq!(
            env.search_paths,
            vec![
                PathBuf::from("/srv/app/frontend/assets/js"),
                PathBuf::from("/opt/shared/assets"),
            ]
        );
        assert_eq!(
            env.static_root,
            Some(PathBuf::from("/srv/app/frontend/public/assets"))
        );
        assert!(env.cache_dir.is_none());
    }

    #[test]
    fn default_root_is_project_dir() {
        let toml = r#"
[project]
name = "site"

[paths]
search = ["assets"]
"#;
        let config = load_config_from_str(toml).unwrap();
        let env = resolve_environment(&config, Path::new("/srv/app"));
        assert_eq!(env.root, PathBuf::from("/srv/app"));
        assert_eq!(env.search_paths, vec![PathBuf::from("/srv/app/assets")]);
    }

    #[test]
    fn extensions_are_normalized_and_deduplicated() {
        let toml = r#"
[project]
name = "site"

[paths]
search = ["assets"]

[extensions]
concatenatable = ["js", ".js", "css"]

[mime_types]
"coffee" = "application/javascript"
"#;
        let config = load_config_from_str(toml).unwrap();
        let env = resolve_environment(&config, Path::new("/srv/app"));
        assert_eq!(env.concatenatable_extensions, vec![".js", ".css"]);
        assert_eq!(env.mime_types[".coffee"], "application/javascript");
    }
}
