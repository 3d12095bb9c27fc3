//! Error types for `quire.toml` loading and validation.

use std::path::PathBuf;

/// Why a `quire.toml` could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// The configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the expected shape.
    #[error("malformed quire.toml: {reason}")]
    Malformed {
        /// The parser's message.
        reason: String,
    },

    /// A required key is absent or empty.
    #[error("quire.toml is missing `{key}`")]
    Missing {
        /// Dotted key, e.g. `paths.search`.
        key: &'static str,
    },

    /// An entry of `paths.search` is empty.
    #[error("`paths.search[{index}]` is empty")]
    EmptySearchPath {
        /// Position in the list.
        index: usize,
    },

    /// An extension is empty or contains a path separator.
    #[error("invalid extension '{extension}' in `{key}`")]
    InvalidExtension {
        /// The table or list the extension appears in.
        key: &'static str,
        /// The offending extension.
        extension: String,
    },

    /// A MIME override is not of the form `type/subtype`.
    #[error("'{mime_type}' for '{extension}' is not a media type")]
    InvalidMimeType {
        /// The extension being overridden.
        extension: String,
        /// The offending value.
        mime_type: String,
    },
}
