//! Storage Module.
//!
//! Persistent artifacts of the onboarding pipelines:
//! - `raw_files`: atomic file primitives (write-sync-rename, write-if-absent).
//! - `artifacts`: the named-slot `ArtifactStore` used for idempotent re-runs.
//!
//! # Idempotency
//! A slot, once written, is never overwritten. Completion of a pipeline is
//! recorded by the presence of its terminal artifact, not by locks.

pub mod artifacts;
pub mod raw_files;

pub use artifacts::{ArtifactStore, FileArtifactStore, MemoryArtifactStore};

use core::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Named artifact slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Artifact {
    /// Blockchain id of the L1 (cb58).
    ChainId,
    /// Subnet id of the L1 (cb58).
    SubnetId,
    /// Node id of the validator being added (`NodeID-...`).
    NodeId,
    /// Proof-of-possession JSON of the validator's BLS key.
    ProofOfPossession,
    /// Registration expiry, decimal unix seconds.
    Expiry,
    /// Signed registration warp message, hex.
    SignedWarpMessage,
    /// Validation id of the registration (cb58).
    ValidationId,
    /// Validator-manager owner private key, hex secp256k1.
    OwnerKey,
}

impl Artifact {
    pub const ALL: [Artifact; 8] = [
        Artifact::ChainId,
        Artifact::SubnetId,
        Artifact::NodeId,
        Artifact::ProofOfPossession,
        Artifact::Expiry,
        Artifact::SignedWarpMessage,
        Artifact::ValidationId,
        Artifact::OwnerKey,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Artifact::ChainId => "chain id",
            Artifact::SubnetId => "subnet id",
            Artifact::NodeId => "node id",
            Artifact::ProofOfPossession => "proof of possession",
            Artifact::Expiry => "expiry",
            Artifact::SignedWarpMessage => "signed warp message",
            Artifact::ValidationId => "validation id",
            Artifact::OwnerKey => "owner key",
        }
    }

    /// Slots whose content must never reach the logs.
    pub fn is_secret(&self) -> bool {
        matches!(self, Artifact::OwnerKey)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors related to storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error with the path involved.
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Invalid path or filename.
    #[error("invalid path {0}")]
    InvalidPath(PathBuf),
    /// File larger than any artifact we produce.
    #[error("{path} is {len} bytes, refusing to read")]
    TooLarge { path: PathBuf, len: u64 },
    /// Stored content does not parse.
    #[error("{artifact} artifact is corrupt: {reason}")]
    Corrupt { artifact: Artifact, reason: String },
    /// A completed artifact already holds different content.
    #[error("{artifact} artifact already exists with different content")]
    Conflict { artifact: Artifact },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}
