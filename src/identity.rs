//! Node and Owner Identity.
//!
//! Everything the registration pipeline knows about "who":
//! - `NodeIdentity`: node id plus the BLS proof of possession of the node
//!   being added.
//! - `OwnerKey`: secp256k1 key that owns the validator-manager contract. It
//!   signs the registration transaction, funds genesis, and its P-Chain
//!   address owns the validator's remaining balance.
//!
//! # Sources
//! `IdentityStore` abstracts where identities come from. `ArtifactIdentityStore`
//! reads them from artifact slots written by earlier provisioning steps.

use core::fmt;
use std::str::FromStr;

use alloy_primitives::{keccak256, Address};
use k256::ecdsa::SigningKey;
use rand_core::OsRng;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::ids::{cb58_decode, Id, NodeId, ShortId};
use crate::storage::{Artifact, ArtifactStore, StorageError};
use crate::warp::{BLS_PUBLIC_KEY_LEN, BLS_SIGNATURE_LEN};

/// Textual prefix of an Avalanche-style CB58 private key.
pub const PRIVATE_KEY_PREFIX: &str = "PrivateKey-";

/// Errors raised while loading identities.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("{0} has not been provisioned")]
    Missing(Artifact),
    #[error("invalid {artifact}: {reason}")]
    Malformed { artifact: Artifact, reason: String },
    #[error("invalid secp256k1 private key")]
    InvalidOwnerKey,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn malformed(artifact: Artifact, reason: impl fmt::Display) -> IdentityError {
    IdentityError::Malformed {
        artifact,
        reason: reason.to_string(),
    }
}

/// BLS public key and its proof of possession.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOfPossession {
    pub public_key: [u8; BLS_PUBLIC_KEY_LEN],
    pub signature: [u8; BLS_SIGNATURE_LEN],
}

/// `info.getNodeID` shape: `{"publicKey":"0x..","proofOfPossession":"0x.."}`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PopFile {
    public_key: String,
    proof_of_possession: String,
}

fn decode_fixed<const N: usize>(field: &str, text: &str) -> Result<[u8; N], String> {
    let raw = hex::decode(text.trim().trim_start_matches("0x"))
        .map_err(|e| format!("{field}: {e}"))?;
    let len = raw.len();
    raw.try_into()
        .map_err(|_| format!("{field}: expected {N} bytes, got {len}"))
}

impl ProofOfPossession {
    pub fn from_json(json: &[u8]) -> Result<Self, IdentityError> {
        let file: PopFile = serde_json::from_slice(json)
            .map_err(|e| malformed(Artifact::ProofOfPossession, e))?;
        Ok(Self {
            public_key: decode_fixed("publicKey", &file.public_key)
                .map_err(|e| malformed(Artifact::ProofOfPossession, e))?,
            signature: decode_fixed("proofOfPossession", &file.proof_of_possession)
                .map_err(|e| malformed(Artifact::ProofOfPossession, e))?,
        })
    }

    pub fn to_json(&self) -> String {
        let file = PopFile {
            public_key: format!("0x{}", hex::encode(self.public_key)),
            proof_of_possession: format!("0x{}", hex::encode(self.signature)),
        };
        // A struct of two strings always serializes.
        serde_json::to_string_pretty(&file).unwrap_or_default()
    }
}

/// Identity of the validator being added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub node_id: NodeId,
    pub pop: ProofOfPossession,
}

/// secp256k1 owner key.
///
/// The inner `SigningKey` zeroizes on drop; the hex export is wrapped in
/// `Zeroizing` as well.
#[derive(Clone)]
pub struct OwnerKey {
    signing: SigningKey,
}

impl OwnerKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        SigningKey::from_slice(bytes)
            .map(|signing| Self { signing })
            .map_err(|_| IdentityError::InvalidOwnerKey)
    }

    /// Parses hex (optionally `0x`-prefixed) or `PrivateKey-<cb58>`.
    pub fn parse(text: &str) -> Result<Self, IdentityError> {
        let text = text.trim();
        let raw = match text.strip_prefix(PRIVATE_KEY_PREFIX) {
            Some(body) => {
                Zeroizing::new(cb58_decode(body).map_err(|_| IdentityError::InvalidOwnerKey)?)
            }
            None => Zeroizing::new(
                hex::decode(text.trim_start_matches("0x"))
                    .map_err(|_| IdentityError::InvalidOwnerKey)?,
            ),
        };
        Self::from_bytes(&raw)
    }

    /// Fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::random(&mut OsRng),
        }
    }

    /// Lowercase hex of the 32-byte scalar, no prefix.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.signing.to_bytes()))
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing
    }

    /// Uncompressed SEC1 public key (65 bytes, `0x04` prefix).
    pub fn public_key_uncompressed(&self) -> Vec<u8> {
        self.signing
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// EVM address: last 20 bytes of keccak256 over the 64-byte public key.
    pub fn eth_address(&self) -> Address {
        eth_address_from_public_key(&self.public_key_uncompressed())
    }

    /// P-Chain address: ripemd160(sha256(compressed public key)).
    pub fn p_chain_address(&self) -> ShortId {
        let compressed = self.signing.verifying_key().to_encoded_point(true);
        let sha = Sha256::digest(compressed.as_bytes());
        ShortId(Ripemd160::digest(sha).into())
    }
}

impl fmt::Debug for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerKey({})", self.eth_address())
    }
}

/// EVM address of an uncompressed SEC1 public key (with or without `0x04`).
pub fn eth_address_from_public_key(public_key: &[u8]) -> Address {
    let body = match public_key {
        [0x04, rest @ ..] if rest.len() == 64 => rest,
        other => other,
    };
    Address::from_slice(&keccak256(body)[12..])
}

/// Source of identities consumed by the pipelines.
pub trait IdentityStore {
    /// Blockchain id of the L1 the validator joins.
    fn chain_id(&self) -> Result<Id, IdentityError>;
    fn subnet_id(&self) -> Result<Id, IdentityError>;
    fn node_identity(&self) -> Result<NodeIdentity, IdentityError>;
    fn owner_key(&self) -> Result<OwnerKey, IdentityError>;
}

/// Identity store over artifact slots.
pub struct ArtifactIdentityStore<'a, S: ArtifactStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ArtifactStore + ?Sized> ArtifactIdentityStore<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn text(&self, artifact: Artifact) -> Result<String, IdentityError> {
        self.store
            .get_text(artifact)?
            .ok_or(IdentityError::Missing(artifact))
    }

    fn parse<T>(&self, artifact: Artifact) -> Result<T, IdentityError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.text(artifact)?
            .parse()
            .map_err(|e| malformed(artifact, e))
    }
}

impl<S: ArtifactStore + ?Sized> IdentityStore for ArtifactIdentityStore<'_, S> {
    fn chain_id(&self) -> Result<Id, IdentityError> {
        self.parse(Artifact::ChainId)
    }

    fn subnet_id(&self) -> Result<Id, IdentityError> {
        self.parse(Artifact::SubnetId)
    }

    fn node_identity(&self) -> Result<NodeIdentity, IdentityError> {
        let node_id = self.parse(Artifact::NodeId)?;
        let pop_json = self
            .store
            .get(Artifact::ProofOfPossession)?
            .ok_or(IdentityError::Missing(Artifact::ProofOfPossession))?;
        Ok(NodeIdentity {
            node_id,
            pop: ProofOfPossession::from_json(&pop_json)?,
        })
    }

    fn owner_key(&self) -> Result<OwnerKey, IdentityError> {
        let text = Zeroizing::new(self.text(Artifact::OwnerKey)?);
        OwnerKey::parse(&text)
    }
}

/// Loads the owner key, generating and persisting one on first use.
///
/// # Returns
/// The key and whether this call created it.
pub fn load_or_generate_owner_key<S: ArtifactStore + ?Sized>(
    store: &S,
) -> Result<(OwnerKey, bool), IdentityError> {
    if let Some(text) = store.get_text(Artifact::OwnerKey)? {
        let text = Zeroizing::new(text);
        return Ok((OwnerKey::parse(&text)?, false));
    }

    let key = OwnerKey::generate();
    let hex = key.to_hex();
    if store.put_text_if_absent(Artifact::OwnerKey, &hex)? {
        log::info!("Generated owner key for {}", key.eth_address());
        return Ok((key, true));
    }

    // Another writer got there first; theirs wins.
    let text = Zeroizing::new(
        store
            .get_text(Artifact::OwnerKey)?
            .ok_or(IdentityError::Missing(Artifact::OwnerKey))?,
    );
    Ok((OwnerKey::parse(&text)?, false))
}
