//! The pipeline configuration shared by a registry and its snapshots.
//!
//! [`Settings`] is cheap to clone: every pluggable capability is held behind
//! an `Arc`. The registry mutates its own copy with `Arc::make_mut`, so a
//! snapshot taken before a mutation keeps seeing the old configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quire_common::ContentHash;

use crate::directive::HeaderDirectiveProcessor;
use crate::mime::{builtin_mime_type, DEFAULT_MIME_TYPE};
use crate::processing::{BundleProcessor, DirectiveProcessor, Engine};

const JAVASCRIPT: &str = "application/javascript";
const CSS: &str = "text/css";

/// Configuration of an asset pipeline.
#[derive(Clone)]
pub struct Settings {
    pub(crate) root: PathBuf,
    pub(crate) paths: Vec<PathBuf>,
    pub(crate) extensions: Vec<String>,
    pub(crate) concatenatable: Vec<String>,
    pub(crate) engines: BTreeMap<String, Arc<dyn Engine>>,
    pub(crate) bundle_processors: BTreeMap<String, Vec<Arc<dyn BundleProcessor>>>,
    pub(crate) js_compressor: Option<Arc<dyn BundleProcessor>>,
    pub(crate) css_compressor: Option<Arc<dyn BundleProcessor>>,
    pub(crate) mime_types: BTreeMap<String, String>,
    pub(crate) directive_processor: Arc<dyn DirectiveProcessor>,
    pub(crate) static_root: Option<PathBuf>,
}

impl Settings {
    /// Creates settings rooted at `root` with no search paths, `.js` and
    /// `.css` concatenatable, and the header directive processor.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths: Vec::new(),
            extensions: Vec::new(),
            concatenatable: vec![".js".to_string(), ".css".to_string()],
            engines: BTreeMap::new(),
            bundle_processors: BTreeMap::new(),
            js_compressor: None,
            css_compressor: None,
            mime_types: BTreeMap::new(),
            directive_processor: Arc::new(HeaderDirectiveProcessor),
            static_root: None,
        }
    }

    /// The project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Search paths in priority order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Directory of precompiled assets, if any.
    pub fn static_root(&self) -> Option<&Path> {
        self.static_root.as_deref()
    }

    /// Extensions whose formats are bundled rather than served as is.
    pub fn concatenatable_extensions(&self) -> &[String] {
        &self.concatenatable
    }

    /// Every extension the search trail may peel off a file name: the
    /// concatenatable ones, explicitly registered ones, MIME override keys
    /// and engine keys.
    pub fn recognized_extensions(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let all = self
            .concatenatable
            .iter()
            .chain(&self.extensions)
            .chain(self.mime_types.keys())
            .chain(self.engines.keys());
        for ext in all {
            if !out.contains(ext) {
                out.push(ext.clone());
            }
        }
        out
    }

    /// Returns `true` if an engine is registered for `ext`.
    pub fn is_engine(&self, ext: &str) -> bool {
        self.engines.contains_key(ext)
    }

    /// The engine registered for `ext`.
    pub fn engine(&self, ext: &str) -> Option<&Arc<dyn Engine>> {
        self.engines.get(ext)
    }

    /// Returns `true` if `ext` is a concatenatable format extension.
    pub fn is_concatenatable(&self, ext: &str) -> bool {
        self.concatenatable.iter().any(|c| c == ext)
    }

    /// The content type for a dotted extension: a registered override, then
    /// the built-in table, then `application/octet-stream`.
    pub fn content_type_for_extension(&self, ext: &str) -> String {
        self.mime_types
            .get(ext)
            .map(String::as_str)
            .or_else(|| builtin_mime_type(ext))
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string()
    }

    /// The bundle processors applied to content of type `mime`, in order:
    /// registered processors, then the compressor slot for the type.
    pub fn bundle_processors_for(&self, mime: &str) -> Vec<Arc<dyn BundleProcessor>> {
        let mut out: Vec<_> = self
            .bundle_processors
            .get(mime)
            .cloned()
            .unwrap_or_default();
        let compressor = match mime {
            JAVASCRIPT => self.js_compressor.as_ref(),
            CSS => self.css_compressor.as_ref(),
            _ => None,
        };
        out.extend(compressor.cloned());
        out
    }

    /// The directive processor.
    pub fn directive_processor(&self) -> &Arc<dyn DirectiveProcessor> {
        &self.directive_processor
    }

    /// A hex digest of everything that influences build output.
    ///
    /// Persisted bundles record the digest they were built under and are
    /// discarded when it no longer matches.
    pub fn environment_digest(&self) -> String {
        let mut parts: Vec<String> = vec![
            format!("quire {}", env!("CARGO_PKG_VERSION")),
            format!("root {}", self.root.display()),
        ];
        parts.extend(self.paths.iter().map(|p| format!("path {}", p.display())));
        parts.extend(self.extensions.iter().map(|e| format!("ext {e}")));
        parts.extend(self.concatenatable.iter().map(|e| format!("concat {e}")));
        parts.extend(
            self.engines
                .iter()
                .map(|(ext, engine)| format!("engine {ext} {}", engine.name())),
        );
        for (mime, processors) in &self.bundle_processors {
            parts.extend(
                processors
                    .iter()
                    .map(|p| format!("processor {mime} {}", p.name())),
            );
        }
        if let Some(c) = &self.js_compressor {
            parts.push(format!("js_compressor {}", c.name()));
        }
        if let Some(c) = &self.css_compressor {
            parts.push(format!("css_compressor {}", c.name()));
        }
        parts.extend(
            self.mime_types
                .iter()
                .map(|(ext, mime)| format!("mime {ext} {mime}")),
        );
        parts.push(format!("directives {}", self.directive_processor.name()));
        if let Some(root) = &self.static_root {
            parts.push(format!("static_root {}", root.display()));
        }
        ContentHash::from_parts(parts.iter().map(String::as_str)).to_string()
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |ps: &Vec<Arc<dyn BundleProcessor>>| -> Vec<String> {
            ps.iter().map(|p| p.name().to_string()).collect()
        };
        f.debug_struct("Settings")
            .field("root", &self.root)
            .field("paths", &self.paths)
            .field("extensions", &self.extensions)
            .field("concatenatable", &self.concatenatable)
            .field(
                "engines",
                &self
                    .engines
                    .iter()
                    .map(|(ext, e)| (ext.as_str(), e.name()))
                    .collect::<Vec<_>>(),
            )
            .field(
                "bundle_processors",
                &self
                    .bundle_processors
                    .iter()
                    .map(|(mime, ps)| (mime.as_str(), names(ps)))
                    .collect::<Vec<_>>(),
            )
            .field("js_compressor", &self.js_compressor.as_ref().map(|c| c.name()))
            .field("css_compressor", &self.css_compressor.as_ref().map(|c| c.name()))
            .field("mime_types", &self.mime_types)
            .field("directive_processor", &self.directive_processor.name())
            .field("static_root", &self.static_root)
            .finish()
    }
}
