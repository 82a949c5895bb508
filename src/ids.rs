//! Identifiers.
//!
//! Fixed-width identifiers used throughout registration:
//! - `Id`: 32-byte identifier (subnet, blockchain, validation id).
//! - `ShortId`: 20-byte identifier (P-Chain addresses).
//! - `NodeId`: 20-byte node identifier, rendered as `NodeID-<cb58>`.
//!
//! # Encoding
//! The textual form is CB58: base58 over `bytes || sha256(bytes)[28..32]`.
//! Parsing verifies the checksum and the decoded length.

use core::fmt;
use core::str::FromStr;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of an `Id` in bytes.
pub const ID_LEN: usize = 32;
/// Length of a `ShortId` / `NodeId` in bytes.
pub const SHORT_ID_LEN: usize = 20;
/// Prefix of the textual node id.
pub const NODE_ID_PREFIX: &str = "NodeID-";

const CHECKSUM_LEN: usize = 4;

/// Errors produced while parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The string is not valid base58.
    #[error("invalid cb58 encoding: {0}")]
    InvalidEncoding(String),
    /// Decoded payload is too short to carry a checksum.
    #[error("cb58 payload too short")]
    MissingChecksum,
    /// The trailing checksum does not match the payload.
    #[error("cb58 checksum mismatch")]
    ChecksumMismatch,
    /// Decoded payload has the wrong width.
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    /// Node id string lacks the `NodeID-` prefix.
    #[error("node id must start with {NODE_ID_PREFIX}")]
    MissingPrefix,
}

/// Encodes bytes as CB58.
pub fn cb58_encode(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut buf = Vec::with_capacity(bytes.len() + CHECKSUM_LEN);
    buf.extend_from_slice(bytes);
    buf.extend_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
    bs58::encode(buf).into_string()
}

/// Decodes a CB58 string, verifying its checksum.
pub fn cb58_decode(s: &str) -> Result<Vec<u8>, IdError> {
    let raw = bs58::decode(s)
        .into_vec()
        .map_err(|e| IdError::InvalidEncoding(e.to_string()))?;
    if raw.len() < CHECKSUM_LEN {
        return Err(IdError::MissingChecksum);
    }
    let (payload, checksum) = raw.split_at(raw.len() - CHECKSUM_LEN);
    let digest = Sha256::digest(payload);
    if &digest[digest.len() - CHECKSUM_LEN..] != checksum {
        return Err(IdError::ChecksumMismatch);
    }
    Ok(payload.to_vec())
}

fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], IdError> {
    bytes.try_into().map_err(|_| IdError::InvalidLength {
        expected: N,
        actual: bytes.len(),
    })
}

/// 32-byte identifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(pub [u8; ID_LEN]);

impl Id {
    /// The all-zero id.
    pub const EMPTY: Id = Id([0u8; ID_LEN]);

    /// Builds an id from a slice, checking its width.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdError> {
        Ok(Self(to_array(bytes)?))
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&cb58_encode(&self.0))
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl FromStr for Id {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&cb58_decode(s.trim())?)
    }
}

/// 20-byte identifier (P-Chain address bytes).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortId(pub [u8; SHORT_ID_LEN]);

impl ShortId {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdError> {
        Ok(Self(to_array(bytes)?))
    }

    pub fn as_bytes(&self) -> &[u8; SHORT_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&cb58_encode(&self.0))
    }
}

impl fmt::Debug for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortId({})", self)
    }
}

impl FromStr for ShortId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&cb58_decode(s.trim())?)
    }
}

/// Node identifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub [u8; SHORT_ID_LEN]);

impl NodeId {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdError> {
        Ok(Self(to_array(bytes)?))
    }

    pub fn as_bytes(&self) -> &[u8; SHORT_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NODE_ID_PREFIX, cb58_encode(&self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for NodeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .trim()
            .strip_prefix(NODE_ID_PREFIX)
            .ok_or(IdError::MissingPrefix)?;
        Self::from_slice(&cb58_decode(body)?)
    }
}
