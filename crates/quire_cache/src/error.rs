//! Error types for the persistent bundle cache.

use std::path::PathBuf;

/// A failure to write to the cache.
///
/// Reading never fails: unusable records and manifests are misses (see
/// [`RecordMiss`](crate::RecordMiss)).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A record, its directory or the manifest could not be written.
    #[error("cannot write {path}: {source}")]
    Write {
        /// The file or directory being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The record directory could not be listed during cleanup.
    #[error("cannot scan {path}: {source}")]
    Scan {
        /// The record directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A record header could not be encoded.
    #[error("cannot encode the record header for {source_path}: {reason}")]
    Header {
        /// The bundle's root source file.
        source_path: PathBuf,
        /// Why encoding failed.
        reason: String,
    },

    /// The manifest could not be encoded as JSON.
    #[error("cannot encode the cache manifest: {reason}")]
    Manifest {
        /// Why encoding failed.
        reason: String,
    },
}
