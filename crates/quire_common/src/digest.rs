//! Content digests used to address built assets.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A SHA-256 digest of an asset's final output.
///
/// This is the externally visible content address of an asset: it is
/// embedded in fingerprinted file names and compared against the
/// fingerprint of a requested logical path. Displayed as 64 lowercase hex
/// characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetDigest([u8; 32]);

impl AssetDigest {
    /// Computes the digest of a byte slice.
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Returns the lowercase hex form of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns `true` if `fingerprint` names this digest.
    ///
    /// Comparison is case-insensitive on the hex text and requires the full
    /// digest; abbreviated fingerprints never match.
    pub fn matches(&self, fingerprint: &str) -> bool {
        fingerprint.eq_ignore_ascii_case(&self.to_hex())
    }
}

impl fmt::Display for AssetDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AssetDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetDigest({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Error returned when a string is not a 64-character hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid asset digest: '{input}'")]
pub struct ParseDigestError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for AssetDigest {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDigestError {
            input: s.to_string(),
        };
        let bytes = hex::decode(s).map_err(|_| err())?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| err())?;
        Ok(Self(arr))
    }
}
