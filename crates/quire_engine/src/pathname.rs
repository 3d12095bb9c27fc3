//! Splitting file names into a stem and an extension chain.
//!
//! `app.js.coffee` has stem `app` and extensions `[".js", ".coffee"]`. Only
//! recognized extensions are peeled off, so `jquery-1.7.2.js` keeps the stem
//! `jquery-1.7.2`.

use std::path::{Component, Path, PathBuf};

/// A file name split into its stem and recognized extension chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AssetPathname<'a> {
    pub stem: &'a str,
    pub extensions: Vec<&'a str>,
}

impl<'a> AssetPathname<'a> {
    /// Splits `file_name`, peeling recognized extensions from the right.
    ///
    /// If no recognized extension is present but the name has one, that last
    /// extension is still treated as the chain so content types can be
    /// looked up for arbitrary files.
    pub fn parse(file_name: &'a str, recognized: &[String]) -> Self {
        let mut stem = file_name;
        let mut extensions = Vec::new();
        while let Some(dot) = stem.rfind('.') {
            if dot == 0 {
                break;
            }
            let ext = &stem[dot..];
            if !recognized.iter().any(|r| r == ext) {
                break;
            }
            extensions.push(ext);
            stem = &stem[..dot];
        }
        if extensions.is_empty() {
            if let Some(dot) = file_name.rfind('.').filter(|&d| d > 0) {
                return Self {
                    stem: &file_name[..dot],
                    extensions: vec![&file_name[dot..]],
                };
            }
        }
        extensions.reverse();
        Self { stem, extensions }
    }

    /// The extension chain joined back together, e.g. `".js.coffee"`.
    pub fn extension_suffix(&self) -> String {
        self.extensions.concat()
    }

    /// Trailing engine extensions, rightmost first. These are applied to
    /// the file contents in the returned order.
    pub fn engine_extensions(&self, is_engine: impl Fn(&str) -> bool) -> Vec<&'a str> {
        self.extensions
            .iter()
            .rev()
            .take_while(|ext| is_engine(ext))
            .copied()
            .collect()
    }

    /// The rightmost extension that is not an engine extension.
    pub fn format_extension(&self, is_engine: impl Fn(&str) -> bool) -> Option<&'a str> {
        self.extensions
            .iter()
            .rev()
            .find(|ext| !is_engine(ext))
            .copied()
    }
}

/// Returns `true` if the last component of `reference` has an extension.
pub(crate) fn has_extension(reference: &str) -> bool {
    let file_name = reference.rsplit('/').next().unwrap_or(reference);
    file_name.rfind('.').is_some_and(|dot| dot > 0)
}

/// Resolves `.` and `..` components lexically, without touching the
/// filesystem.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recognized() -> Vec<String> {
        [".js", ".css", ".coffee", ".erb"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn is_engine(ext: &str) -> bool {
        matches!(ext, ".coffee" | ".erb")
    }

    #[test]
    fn splits_engine_chain() {
        let p = AssetPathname::parse("app.js.coffee.erb", &recognized());
        assert_eq!(p.stem, "app");
        assert_eq!(p.extensions, vec![".js", ".coffee", ".erb"]);
        assert_eq!(p.engine_extensions(is_engine), vec![".erb", ".coffee"]);
        assert_eq!(p.format_extension(is_engine), Some(".js"));
        assert_eq!(p.extension_suffix(), ".js.coffee.erb");
    }

    #[test]
    fn keeps_version_dots_in_stem() {
        let p = AssetPathname::parse("jquery-1.7.2.js", &recognized());
        assert_eq!(p.stem, "jquery-1.7.2");
        assert_eq!(p.extensions, vec![".js"]);
    }

    #[test]
    fn unrecognized_extension_is_still_reported() {
        let p = AssetPathname::parse("logo.png", &recognized());
        assert_eq!(p.stem, "logo");
        assert_eq!(p.extensions, vec![".png"]);
        assert_eq!(p.format_extension(is_engine), Some(".png"));
    }

    #[test]
    fn engine_only_file_has_no_format() {
        let p = AssetPathname::parse("app.coffee", &recognized());
        assert_eq!(p.format_extension(is_engine), None);
    }

    #[test]
    fn dotfiles_and_bare_names() {
        assert_eq!(AssetPathname::parse(".js", &recognized()).stem, ".js");
        let p = AssetPathname::parse("LICENSE", &recognized());
        assert_eq!(p.stem, "LICENSE");
        assert!(p.extensions.is_empty());
    }

    #[test]
    fn has_extension_checks_last_component() {
        assert!(has_extension("lib/b.js"));
        assert!(!has_extension("lib.d/b"));
        assert!(!has_extension(".hidden"));
    }

    #[test]
    fn normalize_resolves_parent_components() {
        assert_eq!(
            normalize_path(Path::new("/assets/js/../lib/./b.js")),
            PathBuf::from("/assets/lib/b.js")
        );
        assert_eq!(normalize_path(Path::new("../x.js")), PathBuf::from("../x.js"));
    }
}
