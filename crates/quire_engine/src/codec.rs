//! Persisted bundle records.
//!
//! A [`PersistedAsset`] is the serializable form of a [`BundledAsset`]. Parts
//! are stored by path only: decoding asks the index for each part again, so
//! required files are rebuilt or restored through the same memo and cycle
//! checks as a normal build.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use quire_common::AssetDigest;
use serde::{Deserialize, Serialize};

use crate::bundled_asset::{BundledAsset, ProcessedAsset};
use crate::dependency::{DependencyRecord, DependencySet};
use crate::error::AssetError;
use crate::index::Index;
use crate::stack::RequireStack;

/// Errors raised while encoding or decoding a persisted record.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The record was built under another configuration.
    #[error("environment digest mismatch: expected {expected}, record has {actual}")]
    EnvironmentMismatch {
        /// The current environment digest.
        expected: String,
        /// The digest stored in the record.
        actual: String,
    },

    /// The record bytes could not be (de)serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },

    /// The record contradicts itself.
    #[error("inconsistent record: {reason}")]
    Inconsistent {
        /// Description of the inconsistency.
        reason: String,
    },
}

/// The serializable form of a bundled asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedAsset {
    /// Logical path the bundle was built for.
    pub logical_path: String,
    /// The bundle's root file.
    pub path: PathBuf,
    /// Content type.
    pub content_type: String,
    /// Latest dependency modification time.
    pub mtime: SystemTime,
    /// The root file's processed body.
    pub body: String,
    /// The compiled output.
    pub source: String,
    /// Digest of `source`.
    pub digest: AssetDigest,
    /// Length of `source` in bytes.
    pub length: u64,
    /// Part paths in output order, the bundle's own path included once.
    pub parts: Vec<PathBuf>,
    /// The own part's dependencies: the file itself and its `depend_on` files.
    pub self_dependencies: Vec<DependencyRecord>,
    /// Every file the bundle depends on.
    pub dependencies: Vec<DependencyRecord>,
    /// Environment digest the bundle was built under.
    pub environment_digest: String,
}

/// Captures a bundle as a record. Compiles the source if needed.
pub fn encode(bundle: &BundledAsset) -> Result<PersistedAsset, AssetError> {
    let source = bundle.source()?.to_string();
    Ok(PersistedAsset {
        logical_path: bundle.logical_path().to_string(),
        path: bundle.path().to_path_buf(),
        content_type: bundle.content_type().to_string(),
        mtime: bundle.mtime(),
        body: bundle.body().to_string(),
        length: source.len() as u64,
        digest: bundle.digest()?,
        source,
        parts: bundle.parts().iter().map(|p| p.path().to_path_buf()).collect(),
        self_dependencies: bundle.self_part().dependencies().records().collect(),
        dependencies: bundle.dependency_set().records().collect(),
        environment_digest: bundle.environment_digest().to_string(),
    })
}

/// Rebuilds a bundle from a record against `index`.
///
/// Fails with [`CodecError::EnvironmentMismatch`] when the record was built
/// under another configuration, and with [`CodecError::Inconsistent`] when
/// its digest does not match its source or its own path is not listed
/// exactly once among the parts.
pub fn decode(
    record: PersistedAsset,
    index: &Index,
    stack: &mut RequireStack,
) -> Result<BundledAsset, AssetError> {
    if record.environment_digest != index.environment_digest() {
        return Err(CodecError::EnvironmentMismatch {
            expected: index.environment_digest().to_string(),
            actual: record.environment_digest,
        }
        .into());
    }
    check_consistency(&record)?;

    let self_dependencies: DependencySet = record.self_dependencies.into_iter().collect();
    let self_mtime = self_dependencies
        .records()
        .find(|r| r.path() == record.path)
        .map_or(record.mtime, |r| r.mtime());
    let self_part = Arc::new(ProcessedAsset::new(
        record.logical_path.clone(),
        record.path.clone(),
        record.body,
        self_mtime,
        self_dependencies,
    ));

    let mut frame = stack.enter(&record.path)?;
    let mut parts = Vec::with_capacity(record.parts.len());
    let mut self_index = 0;
    for (i, part_path) in record.parts.iter().enumerate() {
        if *part_path == record.path {
            self_index = i;
            parts.push(Arc::clone(&self_part));
            continue;
        }
        let logical = index.logical_path_for(part_path);
        let bundle = index.bundle_at(&logical, part_path, &mut frame)?;
        parts.push(Arc::clone(bundle.self_part()));
    }
    drop(frame);

    let processors = index.settings().bundle_processors_for(&record.content_type);
    let bundle = BundledAsset::assemble(
        record.logical_path,
        record.path,
        record.content_type,
        parts,
        self_index,
        record.dependencies.into_iter().collect(),
        record.environment_digest,
        processors,
    );
    Ok(bundle.with_source(record.source, record.digest))
}

fn check_consistency(record: &PersistedAsset) -> Result<(), CodecError> {
    let inconsistent = |reason: &str| CodecError::Inconsistent {
        reason: format!("{}: {reason}", record.path.display()),
    };
    let own = record.parts.iter().filter(|p| **p == record.path).count();
    if own != 1 {
        return Err(inconsistent("own path must appear exactly once in parts"));
    }
    if record.length != record.source.len() as u64 {
        return Err(inconsistent("length does not match source"));
    }
    if AssetDigest::of(record.source.as_bytes()) != record.digest {
        return Err(inconsistent("digest does not match source"));
    }
    Ok(())
}

/// Serializes a record with bincode.
pub fn to_bytes(record: &PersistedAsset) -> Result<Vec<u8>, CodecError> {
    bincode::serde::encode_to_vec(record, bincode::config::standard()).map_err(|e| {
        CodecError::Serialization {
            reason: e.to_string(),
        }
    })
}

/// Deserializes a record written by [`to_bytes`].
pub fn from_bytes(bytes: &[u8]) -> Result<PersistedAsset, CodecError> {
    let (record, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| CodecError::Serialization {
            reason: e.to_string(),
        })?;
    Ok(record)
}
