//! Persistent bundle cache.
//!
//! Encoded bundles are stored as checksummed record files in a cache
//! directory and indexed by a JSON manifest keyed by source path. A process
//! can warm-start from this cache instead of rebuilding every bundle.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod manifest;
pub mod record;

pub use cache::BundleCache;
pub use error::CacheError;
pub use manifest::{BundleEntry, CacheManifest};
pub use record::{RecordDir, RecordHeader, RecordMiss};
