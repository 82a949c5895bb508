//! Warp Messages.
//!
//! Cross-chain messages authenticated by an aggregated BLS signature from a
//! chain's validator set. This module covers the registration flavour only:
//! - `payload`: `RegisterL1Validator` and the `AddressedCall` envelope.
//! - `message`: unsigned and signed message envelopes.
//! - `builder`: deterministic assembly of the full registration message.
//!
//! Everything here is pure. No I/O, no clocks.

pub mod builder;
pub mod message;
pub mod payload;

pub use builder::{RegistrationMessage, WarpMessageBuilder};
pub use message::{BitSetSignature, SignedMessage, UnsignedMessage};
pub use payload::{AddressedCall, PChainOwner, RegisterL1Validator};

use crate::codec::CodecError;
use thiserror::Error;

/// Length of a compressed BLS public key.
pub const BLS_PUBLIC_KEY_LEN: usize = 48;
/// Length of a compressed BLS signature.
pub const BLS_SIGNATURE_LEN: usize = 96;

/// Type id of `RegisterL1Validator` in the platform message codec.
pub const REGISTER_L1_VALIDATOR_TYPE_ID: u32 = 1;
/// Type id of `AddressedCall` in the warp payload codec.
pub const ADDRESSED_CALL_TYPE_ID: u32 = 1;
/// Type id of `BitSetSignature` in the warp codec.
pub const BIT_SET_SIGNATURE_TYPE_ID: u32 = 0;

/// Errors raised while building or parsing warp messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarpError {
    #[error("BLS public key must be {BLS_PUBLIC_KEY_LEN} bytes, got {0}")]
    InvalidBlsKeyLength(usize),
    #[error("{0} owner has no addresses")]
    EmptyOwnerSet(&'static str),
    #[error("owner threshold {threshold} exceeds {addresses} addresses")]
    ThresholdTooHigh { threshold: u32, addresses: usize },
    #[error("node id is empty")]
    EmptyNodeId,
    #[error("validator weight must be non-zero")]
    ZeroWeight,
    #[error("registration expiry must be non-zero")]
    ZeroExpiry,
    #[error(transparent)]
    Codec(#[from] CodecError),
}
