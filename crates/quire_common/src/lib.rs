//! Shared foundational types used across the Quire asset pipeline.
//!
//! This crate provides the two hash types the pipeline relies on: the
//! content-addressing [`AssetDigest`] exposed to callers, and the fast
//! [`ContentHash`] checksum used to validate persisted bundle records. It also
//! provides helpers for fingerprinted logical paths.

#![warn(missing_docs)]

pub mod digest;
pub mod extension;
pub mod fingerprint;
pub mod hash;

pub use digest::{AssetDigest, ParseDigestError};
pub use extension::normalize_extension;
pub use fingerprint::{path_fingerprint, strip_fingerprint, with_fingerprint, FINGERPRINT_LEN};
pub use hash::ContentHash;
