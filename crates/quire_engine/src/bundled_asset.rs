//! Bundled assets: a file plus everything it requires, flattened into one
//! ordered, deduplicated list of parts.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use once_cell::sync::OnceCell;
use quire_common::AssetDigest;

use crate::dependency::DependencySet;
use crate::error::AssetError;
use crate::index::Index;
use crate::processing::BundleProcessor;
use crate::stack::RequireStack;

/// One processed source file: the body it contributes to a bundle and the
/// files it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedAsset {
    logical_path: String,
    path: PathBuf,
    body: String,
    mtime: SystemTime,
    dependencies: DependencySet,
}

impl ProcessedAsset {
    pub(crate) fn new(
        logical_path: String,
        path: PathBuf,
        body: String,
        mtime: SystemTime,
        dependencies: DependencySet,
    ) -> Self {
        Self {
            logical_path,
            path,
            body,
            mtime,
            dependencies,
        }
    }

    /// The logical path of the file.
    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }

    /// The file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file's contents after engines ran and directives were removed.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The file's modification time when processed.
    pub fn mtime(&self) -> SystemTime {
        self.mtime
    }

    /// The file itself plus its `depend_on` files.
    pub fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }
}

struct Compiled {
    source: String,
    digest: AssetDigest,
}

/// A concatenated asset built from a require graph.
///
/// `source`, `digest` and `length` are computed on first access and cached;
/// they fail only when a bundle processor fails.
pub struct BundledAsset {
    logical_path: String,
    path: PathBuf,
    content_type: String,
    mtime: SystemTime,
    parts: Vec<Arc<ProcessedAsset>>,
    self_index: usize,
    dependencies: DependencySet,
    environment_digest: String,
    processors: Vec<Arc<dyn BundleProcessor>>,
    compiled: OnceCell<Compiled>,
}

/// Builds the bundle for the file at `path`.
///
/// `stack` holds the files currently being built by the enclosing top-level
/// build. Each required file is bundled through the index (and so memoized)
/// and its parts are spliced in order, skipping paths already present. The
/// file's own part goes where it required itself, or last.
pub(crate) fn build(
    index: &Index,
    logical_path: &str,
    path: &Path,
    stack: &mut RequireStack,
) -> Result<BundledAsset, AssetError> {
    let mut frame = stack.enter(path)?;
    let processed = index.process(path)?;

    let mut parts: Vec<Arc<ProcessedAsset>> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut dependencies = processed.part.dependencies().clone();

    for required in &processed.requires {
        if required == path {
            if seen.insert(path.to_path_buf()) {
                parts.push(Arc::clone(&processed.part));
            }
            continue;
        }
        if frame.contains(required) {
            return Err(frame.cycle_error(required));
        }
        let required_logical = index.logical_path_for(required);
        let bundle = index.bundle_at(&required_logical, required, &mut frame)?;
        dependencies.merge(bundle.dependency_set());
        for part in bundle.parts() {
            if seen.insert(part.path().to_path_buf()) {
                parts.push(Arc::clone(part));
            }
        }
    }

    let self_index = match parts.iter().position(|p| p.path() == path) {
        Some(i) => i,
        None => {
            parts.push(Arc::clone(&processed.part));
            parts.len() - 1
        }
    };

    let content_type = index.content_type_for(path);
    let processors = index.settings().bundle_processors_for(&content_type);
    Ok(BundledAsset::assemble(
        logical_path.to_string(),
        path.to_path_buf(),
        content_type,
        parts,
        self_index,
        dependencies,
        index.environment_digest().to_string(),
        processors,
    ))
}

impl BundledAsset {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        logical_path: String,
        path: PathBuf,
        content_type: String,
        parts: Vec<Arc<ProcessedAsset>>,
        self_index: usize,
        dependencies: DependencySet,
        environment_digest: String,
        processors: Vec<Arc<dyn BundleProcessor>>,
    ) -> Self {
        let mtime = dependencies
            .latest_mtime()
            .unwrap_or_else(|| parts[self_index].mtime());
        Self {
            logical_path,
            path,
            content_type,
            mtime,
            parts,
            self_index,
            dependencies,
            environment_digest,
            processors,
            compiled: OnceCell::new(),
        }
    }

    /// Attaches an already computed source, as restored from a persisted
    /// record.
    pub(crate) fn with_source(self, source: String, digest: AssetDigest) -> Self {
        Self {
            compiled: OnceCell::with_value(Compiled { source, digest }),
            ..self
        }
    }

    /// A copy of the bundle requested under `logical_path`.
    ///
    /// Bundle processors see the logical path, so the compiled output is only
    /// carried over when there are none.
    pub(crate) fn relabeled(&self, logical_path: &str) -> Self {
        let compiled = match self.compiled.get() {
            Some(c) if self.processors.is_empty() => OnceCell::with_value(Compiled {
                source: c.source.clone(),
                digest: c.digest,
            }),
            _ => OnceCell::new(),
        };
        Self {
            logical_path: logical_path.to_string(),
            path: self.path.clone(),
            content_type: self.content_type.clone(),
            mtime: self.mtime,
            parts: self.parts.clone(),
            self_index: self.self_index,
            dependencies: self.dependencies.clone(),
            environment_digest: self.environment_digest.clone(),
            processors: self.processors.clone(),
            compiled,
        }
    }

    /// The logical path the bundle was requested under.
    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }

    /// The bundle's root file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The latest modification time of any file the bundle depends on.
    pub fn mtime(&self) -> SystemTime {
        self.mtime
    }

    /// The root file's own processed body.
    pub fn body(&self) -> &str {
        self.self_part().body()
    }

    /// Every part in output order, the root file included.
    pub fn parts(&self) -> &[Arc<ProcessedAsset>] {
        &self.parts
    }

    /// The root file's own part.
    pub fn self_part(&self) -> &Arc<ProcessedAsset> {
        &self.parts[self.self_index]
    }

    /// Position of the root file's part in [`parts`](Self::parts).
    pub fn self_index(&self) -> usize {
        self.self_index
    }

    /// The required parts in output order, without the root file.
    pub fn dependencies(&self) -> Vec<&Arc<ProcessedAsset>> {
        self.parts
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.self_index)
            .map(|(_, p)| p)
            .collect()
    }

    /// Every file whose change invalidates the bundle.
    pub fn dependency_set(&self) -> &DependencySet {
        &self.dependencies
    }

    /// The environment digest of the configuration that built the bundle.
    pub fn environment_digest(&self) -> &str {
        &self.environment_digest
    }

    /// Returns `true` if any file the bundle depends on changed or vanished.
    pub fn is_stale(&self) -> bool {
        self.dependencies.is_stale()
    }

    fn compiled(&self) -> Result<&Compiled, AssetError> {
        self.compiled.get_or_try_init(|| {
            let mut source: String = self.parts.iter().map(|p| p.body()).collect();
            for processor in &self.processors {
                source = processor
                    .process(&source, &self.logical_path)
                    .map_err(|e| AssetError::processing(&self.path, e))?;
            }
            let digest = AssetDigest::of(source.as_bytes());
            Ok(Compiled { source, digest })
        })
    }

    /// The concatenated, post-processed output.
    pub fn source(&self) -> Result<&str, AssetError> {
        Ok(&self.compiled()?.source)
    }

    /// Digest of [`source`](Self::source).
    pub fn digest(&self) -> Result<AssetDigest, AssetError> {
        Ok(self.compiled()?.digest)
    }

    /// Length of [`source`](Self::source) in bytes.
    pub fn length(&self) -> Result<u64, AssetError> {
        Ok(self.compiled()?.source.len() as u64)
    }
}

impl fmt::Debug for BundledAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundledAsset")
            .field("logical_path", &self.logical_path)
            .field("path", &self.path)
            .field("content_type", &self.content_type)
            .field(
                "parts",
                &self.parts.iter().map(|p| p.path()).collect::<Vec<_>>(),
            )
            .field("self_index", &self.self_index)
            .field("compiled", &self.compiled.get().is_some())
            .finish_non_exhaustive()
    }
}
