//! Immutable configuration snapshots.
//!
//! An [`Index`] freezes one version of the registry's [`Settings`] and
//! memoizes everything built against it: processed files by path, bundles by
//! path and lookups by logical path. Memo entries are never replaced; when
//! two threads build the same key concurrently the first insert wins and both
//! callers get that value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use quire_cache::BundleCache;
use quire_common::{path_fingerprint, strip_fingerprint};
use tracing::{debug, error, info, warn};

use crate::asset::Asset;
use crate::bundled_asset::{self, BundledAsset, ProcessedAsset};
use crate::codec;
use crate::dependency::{DependencyRecord, DependencySet};
use crate::error::{AssetError, ProcessingError};
use crate::mime::DEFAULT_MIME_TYPE;
use crate::pathname::{has_extension, normalize_path, AssetPathname};
use crate::processing::Requirement;
use crate::settings::Settings;
use crate::stack::RequireStack;
use crate::static_asset::StaticAsset;
use crate::trail::{FsTrail, SearchTrail};

/// A processed file together with its resolved `require` targets.
pub(crate) struct Processed {
    pub part: Arc<ProcessedAsset>,
    pub requires: Vec<PathBuf>,
}

/// An immutable snapshot of the pipeline configuration.
///
/// Obtained from [`Registry::index`](crate::Registry::index). All lookups
/// through one index see the same configuration, and repeated lookups return
/// the memoized result without touching the filesystem.
pub struct Index {
    settings: Arc<Settings>,
    paths: Vec<PathBuf>,
    trail: Arc<dyn SearchTrail>,
    recognized: Vec<String>,
    environment_digest: String,
    generation: u64,
    cache: Option<Arc<Mutex<BundleCache>>>,
    assets: Mutex<HashMap<String, Option<Asset>>>,
    bundles: Mutex<HashMap<PathBuf, Arc<BundledAsset>>>,
    processed: Mutex<HashMap<PathBuf, Arc<Processed>>>,
}

impl Index {
    pub(crate) fn new(
        settings: Arc<Settings>,
        generation: u64,
        cache: Option<Arc<Mutex<BundleCache>>>,
    ) -> Self {
        let paths: Vec<PathBuf> = settings.paths().iter().map(|p| normalize_path(p)).collect();
        Self {
            trail: Arc::new(FsTrail::new(paths.clone())),
            paths,
            recognized: settings.recognized_extensions(),
            environment_digest: settings.environment_digest(),
            generation,
            cache,
            settings,
            assets: Mutex::new(HashMap::new()),
            bundles: Mutex::new(HashMap::new()),
            processed: Mutex::new(HashMap::new()),
        }
    }

    /// The configuration this snapshot was taken from.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Digest of the snapshot's configuration.
    pub fn environment_digest(&self) -> &str {
        &self.environment_digest
    }

    /// The registry generation the snapshot was taken at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Finds and builds the asset for `logical_path`.
    ///
    /// Returns `Ok(None)` when nothing matches, including when a
    /// fingerprinted path resolves to content with a different digest.
    /// Errors are reserved for failures while building a file that exists.
    pub fn find_asset(&self, logical_path: &str) -> Result<Option<Asset>, AssetError> {
        let logical = logical_path.trim_start_matches('/');
        if logical.is_empty() || logical.split('/').any(|segment| segment == "..") {
            return Ok(None);
        }
        if let Some(hit) = self.assets.lock().get(logical) {
            return Ok(hit.clone());
        }

        let found = self.lookup(logical)?;
        let mut assets = self.assets.lock();
        Ok(assets.entry(logical.to_string()).or_insert(found).clone())
    }

    fn lookup(&self, logical: &str) -> Result<Option<Asset>, AssetError> {
        if let Some(asset) = self.find_static(logical)? {
            return Ok(Some(asset));
        }

        let fingerprint = path_fingerprint(logical);
        if let Some(fingerprint) = fingerprint {
            let plain = strip_fingerprint(logical);
            if let Some(path) = not_found_as_none(self.resolve(&plain))? {
                let asset = self.build_asset(&plain, &path)?;
                return verified(logical, fingerprint, asset);
            }
        }

        // A file literally named like a fingerprint still has to match it.
        match not_found_as_none(self.resolve(logical))? {
            Some(path) => {
                let asset = self.build_asset(logical, &path)?;
                match fingerprint {
                    Some(fingerprint) => verified(logical, fingerprint, asset),
                    None => Ok(Some(asset)),
                }
            }
            None => Ok(None),
        }
    }

    fn find_static(&self, logical: &str) -> Result<Option<Asset>, AssetError> {
        let Some(root) = self.settings.static_root() else {
            return Ok(None);
        };
        let path = root.join(logical);
        if !path.is_file() {
            return Ok(None);
        }
        let asset = StaticAsset::build(logical, &path, self.content_type_for(&path))?;
        Ok(Some(Asset::Static(Arc::new(asset))))
    }

    /// Resolves a logical path to a file.
    ///
    /// `foo.js` prefers `foo/index.js` over `foo.js`; a name whose stem is
    /// already `index` is looked up directly.
    pub fn resolve(&self, logical_path: &str) -> Result<PathBuf, AssetError> {
        let (dir, file_name) = match logical_path.rfind('/') {
            Some(i) => logical_path.split_at(i + 1),
            None => ("", logical_path),
        };
        let name = AssetPathname::parse(file_name, &self.recognized);
        if name.stem != "index" {
            let index_path = format!("{dir}{}/index{}", name.stem, name.extension_suffix());
            if let Some(path) = self.trail.find(&index_path, &self.recognized) {
                return Ok(normalize_path(&path));
            }
        }
        self.trail
            .find(logical_path, &self.recognized)
            .map(|path| normalize_path(&path))
            .ok_or_else(|| AssetError::not_found(logical_path))
    }

    fn build_asset(&self, logical: &str, path: &Path) -> Result<Asset, AssetError> {
        if self.is_concatenatable(path) {
            let bundle = self.bundle_at(logical, path, &mut RequireStack::new())?;
            // The bundle memo is keyed by file, so a bundle first reached
            // through a require may carry another logical path.
            if bundle.logical_path() != logical {
                return Ok(Asset::Bundled(Arc::new(bundle.relabeled(logical))));
            }
            Ok(Asset::Bundled(bundle))
        } else {
            let asset = StaticAsset::build(logical, path, self.content_type_for(path))?;
            Ok(Asset::Static(Arc::new(asset)))
        }
    }

    /// Returns the bundle rooted at `path`, building it if needed.
    ///
    /// `stack` is the require stack of the enclosing top-level build.
    pub(crate) fn bundle_at(
        &self,
        logical: &str,
        path: &Path,
        stack: &mut RequireStack,
    ) -> Result<Arc<BundledAsset>, AssetError> {
        if let Some(hit) = self.bundles.lock().get(path) {
            return Ok(Arc::clone(hit));
        }
        if stack.contains(path) {
            return Err(stack.cycle_error(path));
        }

        let bundle = match self.restore(path, stack) {
            Some(bundle) => bundle,
            None => {
                info!(logical_path = logical, path = %path.display(), "building bundle");
                let built = bundled_asset::build(self, logical, path, stack)?;
                self.persist(&built)?;
                built
            }
        };

        let mut bundles = self.bundles.lock();
        let entry = bundles
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(bundle));
        Ok(Arc::clone(entry))
    }

    /// Loads a bundle from the persistent cache. Any failure is a miss.
    fn restore(&self, path: &Path, stack: &mut RequireStack) -> Option<BundledAsset> {
        let cache = self.cache.as_ref()?;
        let bytes = cache.lock().load_bundle(path, &self.environment_digest)?;
        let record = match codec::from_bytes(&bytes) {
            Ok(record) => record,
            Err(err) => {
                debug!(path = %path.display(), %err, "discarding unreadable persisted bundle");
                return None;
            }
        };
        match codec::decode(record, self, stack) {
            Ok(bundle) if !bundle.is_stale() => {
                debug!(path = %path.display(), "restored bundle from persistent cache");
                Some(bundle)
            }
            Ok(_) => {
                debug!(path = %path.display(), "persisted bundle is stale");
                None
            }
            Err(err) => {
                debug!(path = %path.display(), %err, "discarding persisted bundle");
                None
            }
        }
    }

    /// Writes a freshly built bundle to the persistent cache.
    ///
    /// Compiles the bundle's source, so processor failures surface here.
    /// Failures of the cache itself only log.
    fn persist(&self, bundle: &BundledAsset) -> Result<(), AssetError> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        let record = codec::encode(bundle)?;
        let bytes = match codec::to_bytes(&record) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %bundle.path().display(), %err, "failed to encode bundle");
                return Ok(());
            }
        };
        let stored = cache.lock().store_bundle(
            bundle.path(),
            bundle.logical_path(),
            &self.environment_digest,
            &bytes,
        );
        if let Err(err) = stored {
            warn!(path = %bundle.path().display(), %err, "failed to persist bundle (non-fatal)");
        }
        Ok(())
    }

    /// Runs engines and the directive processor over the file at `path` and
    /// resolves its references.
    pub(crate) fn process(&self, path: &Path) -> Result<Arc<Processed>, AssetError> {
        if let Some(hit) = self.processed.lock().get(path) {
            return Ok(Arc::clone(hit));
        }

        let own = DependencyRecord::capture(path)?;
        let mut text = std::fs::read_to_string(path).map_err(|e| AssetError::from_io(path, e))?;

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let name = AssetPathname::parse(file_name, &self.recognized);
        for ext in name.engine_extensions(|e| self.settings.is_engine(e)) {
            if let Some(engine) = self.settings.engine(ext) {
                text = engine
                    .transform(&text, path)
                    .map_err(|e| AssetError::processing(path, e))?;
            }
        }

        let directives = self
            .settings
            .directive_processor()
            .process(&text, path)
            .map_err(|e| AssetError::processing(path, e))?;

        let mut dependencies = DependencySet::new();
        dependencies.insert(own.clone());
        for reference in &directives.depends_on {
            let target = self.resolve_reference(reference, path)?;
            dependencies.insert(DependencyRecord::capture(&target)?);
        }
        let mut requires = Vec::with_capacity(directives.requires.len());
        for requirement in &directives.requires {
            match requirement {
                Requirement::File(reference) => {
                    requires.push(self.resolve_reference(reference, path)?);
                }
                Requirement::Tree(reference) => requires.extend(self.expand_tree(reference, path)?),
            }
        }

        let part = ProcessedAsset::new(
            self.logical_path_for(path),
            path.to_path_buf(),
            directives.body,
            own.mtime(),
            dependencies,
        );
        let processed = Arc::new(Processed {
            part: Arc::new(part),
            requires,
        });
        let mut memo = self.processed.lock();
        Ok(Arc::clone(memo.entry(path.to_path_buf()).or_insert(processed)))
    }

    /// Resolves a reference made by the file at `from`.
    ///
    /// `./` and `../` references are relative to `from`'s directory, absolute
    /// paths are taken as they are, and anything else is a logical path. A
    /// reference without an extension tries `from`'s format extension first.
    pub(crate) fn resolve_reference(&self, reference: &str, from: &Path) -> Result<PathBuf, AssetError> {
        let mut candidates = Vec::with_capacity(2);
        if !has_extension(reference) {
            if let Some(ext) = self.format_extension_of(from) {
                candidates.push(format!("{reference}{ext}"));
            }
        }
        candidates.push(reference.to_string());

        let target = if Path::new(reference).is_absolute() {
            candidates.iter().find_map(|c| self.find_file(Path::new(c)))
        } else if reference.starts_with("./") || reference.starts_with("../") {
            let base = from.parent().unwrap_or(Path::new(""));
            candidates.iter().find_map(|c| self.find_file(&base.join(c)))
        } else {
            candidates
                .iter()
                .find_map(|c| not_found_as_none(self.resolve(c)).transpose())
                .transpose()?
        };
        target.ok_or_else(|| AssetError::not_found(reference))
    }

    /// Lists the bundleable files below the directory `reference` whose
    /// format extension is `from`'s, sorted by path and without `from`.
    ///
    /// `./` and `../` directories are relative to `from`; any other
    /// directory is looked up in the search paths.
    fn expand_tree(&self, reference: &str, from: &Path) -> Result<Vec<PathBuf>, AssetError> {
        let root = self.tree_root(reference, from).ok_or_else(|| {
            let message = format!("require_tree argument must be a directory: {reference}");
            AssetError::processing(from, ProcessingError::new(message))
        })?;
        let format = self.format_extension_of(from);

        let mut files = Vec::new();
        collect_files(&root, &mut files).map_err(|e| AssetError::from_io(&root, e))?;
        files.sort();
        Ok(files
            .into_iter()
            .filter(|file| {
                file != from
                    && self.is_concatenatable(file)
                    && self.format_extension_of(file) == format
            })
            .collect())
    }

    fn tree_root(&self, reference: &str, from: &Path) -> Option<PathBuf> {
        let rel = reference.trim_end_matches('/');
        let relative = rel == "." || rel.starts_with("./") || rel.starts_with("../");
        let root = if relative || Path::new(rel).is_absolute() {
            let base = from.parent().unwrap_or(Path::new(""));
            normalize_path(&base.join(rel))
        } else {
            self.paths.iter().map(|p| p.join(rel)).find(|p| p.is_dir())?
        };
        root.is_dir().then_some(root)
    }

    /// Finds a file at `path`, also accepting `path` followed by recognized
    /// extensions.
    fn find_file(&self, path: &Path) -> Option<PathBuf> {
        let path = normalize_path(path);
        let dir = path.parent()?;
        let name = path.file_name()?.to_str()?;
        FsTrail::new(vec![dir.to_path_buf()])
            .find(name, &self.recognized)
            .map(|p| normalize_path(&p))
    }

    /// The logical path of a file: its path below the first search path that
    /// contains it, without trailing engine extensions.
    pub(crate) fn logical_path_for(&self, path: &Path) -> String {
        let Some(rel) = self.paths.iter().find_map(|root| path.strip_prefix(root).ok()) else {
            return path.to_string_lossy().into_owned();
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        let file_name = rel.rsplit('/').next().unwrap_or(rel.as_str());
        let name = AssetPathname::parse(file_name, &self.recognized);
        let engine_len: usize = name
            .engine_extensions(|e| self.settings.is_engine(e))
            .iter()
            .map(|ext| ext.len())
            .sum();
        rel[..rel.len() - engine_len].to_string()
    }

    fn format_extension_of(&self, path: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_str()?;
        AssetPathname::parse(file_name, &self.recognized)
            .format_extension(|e| self.settings.is_engine(e))
            .map(str::to_string)
    }

    /// The content type of the file at `path`, from its format extension.
    pub fn content_type_for(&self, path: &Path) -> String {
        match self.format_extension_of(path) {
            Some(ext) => self.settings.content_type_for_extension(&ext),
            None => DEFAULT_MIME_TYPE.to_string(),
        }
    }

    /// Returns `true` if the file at `path` is built as a bundle.
    pub fn is_concatenatable(&self, path: &Path) -> bool {
        self.format_extension_of(path)
            .is_some_and(|ext| self.settings.is_concatenatable(&ext))
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Keeps `asset` only if its digest is the one `fingerprint` names.
fn verified(logical: &str, fingerprint: &str, asset: Asset) -> Result<Option<Asset>, AssetError> {
    let digest = asset.digest()?;
    if digest.matches(fingerprint) {
        return Ok(Some(asset));
    }
    let err = AssetError::FingerprintMismatch {
        logical_path: logical.to_string(),
        expected: fingerprint.to_string(),
        actual: digest.to_hex(),
    };
    error!(%err, "integrity check failed");
    Ok(None)
}

fn not_found_as_none<T>(result: Result<T, AssetError>) -> Result<Option<T>, AssetError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AssetError::FileNotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}
