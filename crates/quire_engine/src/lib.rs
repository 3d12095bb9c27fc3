//! Incremental asset bundling.
//!
//! A [`Registry`] resolves logical paths such as `app.js` to source files,
//! expands their `require` graphs into ordered, deduplicated bundles, runs
//! the configured engines and processors, and hands out content-addressed
//! [`Asset`]s that it keeps until one of their input files changes.
//!
//! ```no_run
//! use quire_engine::Registry;
//!
//! let registry = Registry::new("/srv/app");
//! registry.append_path("assets/javascripts");
//! if let Some(asset) = registry.find_asset("application.js")? {
//!     println!("{} {}", asset.digest()?, asset.length()?);
//! }
//! # Ok::<(), quire_engine::AssetError>(())
//! ```
//!
//! Builds run against immutable [`Index`] snapshots, so configuration
//! changes never affect a build in progress. With a persistent cache
//! ([`Registry::with_persistent_cache`]) bundles survive process restarts and
//! are restored instead of rebuilt while their inputs are unchanged.

#![warn(missing_docs)]

pub mod asset;
pub mod bundled_asset;
pub mod codec;
pub mod dependency;
pub mod directive;
pub mod error;
pub mod index;
pub mod mime;
pub mod precompile;
pub mod processing;
pub mod registry;
pub mod settings;
pub mod stack;
pub mod static_asset;
pub mod trail;

mod pathname;

pub use asset::Asset;
pub use bundled_asset::{BundledAsset, ProcessedAsset};
pub use codec::{CodecError, PersistedAsset};
pub use dependency::{DependencyRecord, DependencySet};
pub use directive::HeaderDirectiveProcessor;
pub use error::{AssetError, ProcessingError};
pub use index::Index;
pub use precompile::PrecompileManifest;
pub use processing::{
    BundleProcessor, DirectiveProcessor, Directives, Engine, FnEngine, FnProcessor, Requirement,
};
pub use registry::Registry;
pub use settings::Settings;
pub use stack::{RequireStack, StackFrame};
pub use static_asset::StaticAsset;
pub use trail::{FsTrail, SearchTrail};

pub use quire_common::AssetDigest;
