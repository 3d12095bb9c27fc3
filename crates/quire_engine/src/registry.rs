//! The long-lived, mutable front door of the pipeline.
//!
//! A [`Registry`] owns the configuration and a freshness cache of assets by
//! logical path. Lookups that miss the cache build against a fresh [`Index`]
//! snapshot outside any lock. Every configuration change replaces the
//! settings (copy-on-write), clears the freshness cache and bumps a
//! generation counter, so builds started against an older snapshot are
//! returned to their callers but never cached.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use quire_cache::BundleCache;
use quire_common::{normalize_extension, path_fingerprint};
use quire_config::{load_config, resolve_environment, QuireConfig, ResolvedEnvironment};
use tracing::{debug, info, warn};

use crate::asset::Asset;
use crate::error::AssetError;
use crate::index::Index;
use crate::precompile::{self, PrecompileManifest};
use crate::processing::{BundleProcessor, DirectiveProcessor, Engine};
use crate::settings::Settings;

/// Version tag written into the persistent cache manifest.
const QUIRE_VERSION: &str = env!("CARGO_PKG_VERSION");

struct RegistryState {
    settings: Arc<Settings>,
    assets: HashMap<String, Asset>,
    generation: u64,
}

/// A mutable asset pipeline.
///
/// `Registry` is `Send + Sync`; share it behind an `Arc` and call
/// [`find_asset`](Self::find_asset) from any number of threads.
pub struct Registry {
    state: RwLock<RegistryState>,
    cache: Option<Arc<Mutex<BundleCache>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Creates a registry rooted at `root` with no search paths.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_settings(Settings::new(root))
    }

    /// Creates a registry from prepared settings.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                settings: Arc::new(settings),
                assets: HashMap::new(),
                generation: 0,
            }),
            cache: None,
        }
    }

    /// Creates a registry from a resolved `quire.toml` environment.
    ///
    /// A configured cache directory enables the persistent bundle cache.
    pub fn from_environment(env: &ResolvedEnvironment) -> Self {
        let mut settings = Settings::new(&env.root);
        settings.paths = env.search_paths.clone();
        settings.extensions = env.recognized_extensions.clone();
        settings.concatenatable = env.concatenatable_extensions.clone();
        settings.mime_types = env.mime_types.clone();
        settings.static_root = env.static_root.clone();

        let registry = Self::with_settings(settings);
        match &env.cache_dir {
            Some(dir) => registry.with_persistent_cache(dir),
            None => registry,
        }
    }

    /// Creates a registry from a loaded configuration whose `quire.toml`
    /// lives in `project_dir`.
    pub fn from_config(config: &QuireConfig, project_dir: &Path) -> Self {
        Self::from_environment(&resolve_environment(config, project_dir))
    }

    /// Loads `quire.toml` from `project_dir` and creates a registry from it.
    pub fn from_config_dir(project_dir: &Path) -> Result<Self, AssetError> {
        let config = load_config(project_dir)?;
        Ok(Self::from_config(&config, project_dir))
    }

    /// Enables the persistent bundle cache in `cache_dir`.
    ///
    /// Bundles built from now on are written to the cache, and bundles found
    /// there are restored instead of rebuilt when still fresh.
    pub fn with_persistent_cache(mut self, cache_dir: &Path) -> Self {
        let cache = BundleCache::load_or_create(cache_dir, QUIRE_VERSION);
        info!(
            cache_dir = %cache_dir.display(),
            entries = cache.manifest().bundles.len(),
            "opened persistent bundle cache"
        );
        self.cache = Some(Arc::new(Mutex::new(cache)));
        self
    }

    /// Takes a snapshot of the current configuration.
    pub fn index(&self) -> Arc<Index> {
        let state = self.state.read();
        Arc::new(Index::new(
            Arc::clone(&state.settings),
            state.generation,
            self.cache.clone(),
        ))
    }

    /// The current configuration.
    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.state.read().settings)
    }

    /// Number of configuration changes so far.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Digest of the current configuration.
    pub fn environment_digest(&self) -> String {
        self.state.read().settings.environment_digest()
    }

    /// Finds the asset for `logical_path`, reusing a cached build while it is
    /// fresh.
    ///
    /// Fingerprinted paths name immutable content and skip the freshness
    /// check; only a full digest that matched the built content is ever
    /// cached under such a path. Returns `Ok(None)` when nothing matches or a fingerprint does
    /// not match the built content.
    pub fn find_asset(&self, logical_path: &str) -> Result<Option<Asset>, AssetError> {
        let key = logical_path.trim_start_matches('/');

        let cached = self.state.read().assets.get(key).cloned();
        if let Some(asset) = cached {
            if path_fingerprint(key).is_some() {
                return Ok(Some(asset));
            }
            if !asset.is_stale() {
                debug!(logical_path = key, "asset is fresh");
                return Ok(Some(asset));
            }
            warn!(logical_path = key, "asset is stale, rebuilding");
            let mut state = self.state.write();
            if state
                .assets
                .get(key)
                .is_some_and(|current| same_build(current, &asset))
            {
                state.assets.remove(key);
            }
        }

        let index = self.index();
        let found = index.find_asset(key)?;
        if let Some(asset) = &found {
            let mut state = self.state.write();
            if state.generation == index.generation() {
                state.assets.insert(key.to_string(), asset.clone());
            } else {
                debug!(logical_path = key, "configuration changed during build, not caching");
            }
        }
        Ok(found)
    }

    /// Writes the persistent cache manifest and removes unreferenced
    /// record files. Entries for source files that no longer exist are dropped
    /// first. Does nothing without a persistent cache.
    pub fn persist_cache(&self) -> Result<(), AssetError> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        let mut cache = cache.lock();
        let missing: Vec<PathBuf> = cache
            .manifest()
            .bundles
            .keys()
            .filter(|path| !path.exists())
            .cloned()
            .collect();
        cache.remove(&missing);
        cache.save()?;
        let removed = cache.gc()?;
        debug!(
            entries = cache.manifest().bundles.len(),
            pruned = missing.len(),
            removed,
            "saved persistent bundle cache"
        );
        Ok(())
    }

    /// Builds `logical_paths` in parallel and writes fingerprinted copies plus
    /// a `manifest.json` to `target`.
    pub fn precompile(
        &self,
        logical_paths: &[&str],
        target: &Path,
    ) -> Result<PrecompileManifest, AssetError> {
        precompile::precompile(self, logical_paths, target)
    }

    fn configure(&self, change: impl FnOnce(&mut Settings)) {
        let mut state = self.state.write();
        change(Arc::make_mut(&mut state.settings));
        state.assets.clear();
        state.generation += 1;
    }

    fn anchored(&self, path: &Path) -> PathBuf {
        self.state.read().settings.root().join(path)
    }

    /// Adds a search path with the lowest priority. Relative paths are
    /// anchored at the root.
    pub fn append_path(&self, path: impl AsRef<Path>) {
        let path = self.anchored(path.as_ref());
        self.configure(|s| s.paths.push(path));
    }

    /// Adds a search path with the highest priority.
    pub fn prepend_path(&self, path: impl AsRef<Path>) {
        let path = self.anchored(path.as_ref());
        self.configure(|s| s.paths.insert(0, path));
    }

    /// Removes a search path.
    pub fn remove_path(&self, path: impl AsRef<Path>) {
        let path = self.anchored(path.as_ref());
        self.configure(|s| s.paths.retain(|p| *p != path));
    }

    /// Makes the trail recognize an extension.
    pub fn register_extension(&self, ext: &str) {
        let ext = normalize_extension(ext);
        self.configure(|s| {
            if !s.extensions.contains(&ext) {
                s.extensions.push(ext);
            }
        });
    }

    /// Stops recognizing an explicitly registered extension.
    pub fn unregister_extension(&self, ext: &str) {
        let ext = normalize_extension(ext);
        self.configure(|s| s.extensions.retain(|e| *e != ext));
    }

    /// Makes files with this format extension build as bundles.
    pub fn register_concatenatable_extension(&self, ext: &str) {
        let ext = normalize_extension(ext);
        self.configure(|s| {
            if !s.concatenatable.contains(&ext) {
                s.concatenatable.push(ext);
            }
        });
    }

    /// Serves files with this format extension as static assets again.
    pub fn unregister_concatenatable_extension(&self, ext: &str) {
        let ext = normalize_extension(ext);
        self.configure(|s| s.concatenatable.retain(|e| *e != ext));
    }

    /// Registers the engine applied to files ending in `ext`, replacing any
    /// previous one.
    pub fn register_engine(&self, ext: &str, engine: impl Engine + 'static) {
        let ext = normalize_extension(ext);
        let engine: Arc<dyn Engine> = Arc::new(engine);
        self.configure(|s| {
            s.engines.insert(ext, engine);
        });
    }

    /// Removes the engine for `ext`.
    pub fn unregister_engine(&self, ext: &str) {
        let ext = normalize_extension(ext);
        self.configure(|s| {
            s.engines.remove(&ext);
        });
    }

    /// Appends a bundle processor for content of type `mime`.
    pub fn register_bundle_processor(&self, mime: &str, processor: impl BundleProcessor + 'static) {
        let processor: Arc<dyn BundleProcessor> = Arc::new(processor);
        self.configure(|s| {
            s.bundle_processors
                .entry(mime.to_string())
                .or_default()
                .push(processor);
        });
    }

    /// Removes the bundle processors called `name` for `mime`.
    pub fn unregister_bundle_processor(&self, mime: &str, name: &str) {
        self.configure(|s| {
            if let Some(processors) = s.bundle_processors.get_mut(mime) {
                processors.retain(|p| p.name() != name);
                if processors.is_empty() {
                    s.bundle_processors.remove(mime);
                }
            }
        });
    }

    /// Sets or clears the processor run last over JavaScript bundles.
    pub fn set_js_compressor(&self, compressor: Option<Arc<dyn BundleProcessor>>) {
        self.configure(|s| s.js_compressor = compressor);
    }

    /// Sets or clears the processor run last over CSS bundles.
    pub fn set_css_compressor(&self, compressor: Option<Arc<dyn BundleProcessor>>) {
        self.configure(|s| s.css_compressor = compressor);
    }

    /// Overrides the content type for `ext`.
    pub fn register_mime_type(&self, ext: &str, mime: &str) {
        let ext = normalize_extension(ext);
        let mime = mime.to_string();
        self.configure(|s| {
            s.mime_types.insert(ext, mime);
        });
    }

    /// Removes a content type override.
    pub fn unregister_mime_type(&self, ext: &str) {
        let ext = normalize_extension(ext);
        self.configure(|s| {
            s.mime_types.remove(&ext);
        });
    }

    /// Replaces the directive processor.
    pub fn set_directive_processor(&self, processor: impl DirectiveProcessor + 'static) {
        let processor: Arc<dyn DirectiveProcessor> = Arc::new(processor);
        self.configure(|s| s.directive_processor = processor);
    }

    /// Sets or clears the directory of precompiled assets consulted before
    /// the search paths.
    pub fn set_static_root(&self, root: Option<PathBuf>) {
        let root = root.map(|r| self.anchored(&r));
        self.configure(|s| s.static_root = root);
    }
}

fn same_build(a: &Asset, b: &Asset) -> bool {
    match (a, b) {
        (Asset::Static(a), Asset::Static(b)) => Arc::ptr_eq(a, b),
        (Asset::Bundled(a), Asset::Bundled(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}
