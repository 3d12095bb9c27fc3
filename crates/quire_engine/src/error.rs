//! Error types for asset resolution and building.

use std::path::{Path, PathBuf};

use quire_cache::CacheError;
use quire_config::ConfigError;

use crate::codec::CodecError;

/// Failure reported by a pluggable engine, directive processor or bundle
/// processor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProcessingError {
    /// Description of the failure.
    pub message: String,
}

impl ProcessingError {
    /// Creates a new processing error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ProcessingError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

/// Errors that can occur while resolving or building an asset.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// A logical or required path does not resolve to any file.
    #[error("couldn't find file '{logical_path}'")]
    FileNotFound {
        /// The reference that failed to resolve.
        logical_path: String,
    },

    /// A require graph references a file that is already being built.
    #[error("{} has already been required (chain: {})", path.display(), format_chain(chain))]
    CircularDependency {
        /// The file that closes the cycle.
        path: PathBuf,
        /// The files on the require stack, outermost first, ending with `path`.
        chain: Vec<PathBuf>,
    },

    /// A fingerprinted logical path resolved to content with another digest.
    #[error("fingerprint mismatch for '{logical_path}': requested {expected}, built {actual}")]
    FingerprintMismatch {
        /// The requested logical path.
        logical_path: String,
        /// The fingerprint embedded in the request.
        expected: String,
        /// The digest of the content that was built.
        actual: String,
    },

    /// An engine, directive processor or bundle processor failed.
    #[error("failed to process {}: {source}", path.display())]
    Processing {
        /// The file being processed.
        path: PathBuf,
        /// The underlying failure.
        source: ProcessingError,
    },

    /// An I/O error occurred while reading an input or writing output.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A precompile manifest could not be written.
    #[error("failed to write manifest {}: {reason}", path.display())]
    Manifest {
        /// The manifest path.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A persisted record could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The persistent cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The pipeline configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AssetError {
    /// Creates a [`AssetError::FileNotFound`] for a reference.
    pub fn not_found(logical_path: impl Into<String>) -> Self {
        Self::FileNotFound {
            logical_path: logical_path.into(),
        }
    }

    /// Maps an I/O error on `path` to [`AssetError::FileNotFound`] when the
    /// file is missing and to [`AssetError::Io`] otherwise.
    pub(crate) fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::not_found(path.display().to_string())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub(crate) fn processing(path: &Path, source: ProcessingError) -> Self {
        Self::Processing {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_display() {
        let err = AssetError::not_found("app.js");
        assert_eq!(err.to_string(), "couldn't find file 'app.js'");
    }

    #[test]
    fn circular_dependency_display_includes_chain() {
        let err = AssetError::CircularDependency {
            path: PathBuf::from("a.js"),
            chain: vec![
                PathBuf::from("a.js"),
                PathBuf::from("b.js"),
                PathBuf::from("a.js"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("a.js has already been required"));
        assert!(msg.contains("a.js -> b.js -> a.js"));
    }

    #[test]
    fn processing_display_wraps_cause() {
        let err = AssetError::processing(Path::new("app.js"), ProcessingError::new("boom"));
        assert_eq!(err.to_string(), "failed to process app.js: boom");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn from_io_maps_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = AssetError::from_io(Path::new("x.js"), io);
        assert!(matches!(err, AssetError::FileNotFound { .. }));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AssetError::from_io(Path::new("x.js"), io);
        assert!(matches!(err, AssetError::Io { .. }));
    }

    #[test]
    fn fingerprint_mismatch_display() {
        let err = AssetError::FingerprintMismatch {
            logical_path: "app-aaaa.js".to_string(),
            expected: "aaaa".to_string(),
            actual: "bbbb".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("requested aaaa"));
        assert!(msg.contains("built bbbb"));
    }
}
