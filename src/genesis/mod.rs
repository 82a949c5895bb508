//! L1 Genesis.
//!
//! Builds a genesis document in which an upgradeable PoA validator manager
//! already exists at block zero:
//!
//! ```text
//! deployer        10 native tokens
//! library         ValidatorMessages code
//! logic           PoAValidatorManager code, linked against the library
//! proxy admin     slot 0 = deployer
//! proxy           EIP-1967 implementation = logic, admin = proxy admin
//! ```
//!
//! Construction is a pure function of (deployer key, timestamp, bytecode
//! artifacts); only `GenesisAllocationBuilder::write` touches the disk.

pub mod addressing;
pub mod builder;
pub mod linker;
pub mod proxy;
pub mod types;

pub use addressing::{AddressingScheme, ContractDeploymentPlan};
pub use builder::{GenesisAllocationBuilder, GenesisArtifacts};
pub use linker::{library_placeholder, LibraryLink, LinkSubstitution, UnlinkedBytecode};
pub use types::{ChainConfig, FeeConfig, Genesis, GenesisAccount, WarpConfig};

use alloy_primitives::Address;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A bytecode artifact is missing its bytecode or is not hex.
    #[error("malformed contract artifact {origin}: {reason}")]
    MalformedArtifact { origin: String, reason: String },
    /// A link was requested but the bytecode has no placeholder for it.
    #[error("{origin} has no link placeholder for {library}")]
    MissingPlaceholder { origin: String, library: String },
    /// Placeholder left in bytecode after linking.
    #[error("{origin} has an unresolved link placeholder at hex offset {offset}")]
    UnresolvedPlaceholder { origin: String, offset: usize },
    #[error("two genesis accounts share address {0}")]
    AddressCollision(Address),
    #[error("invalid deployer public key")]
    InvalidPublicKey,
    #[error("genesis serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
