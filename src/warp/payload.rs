//! Registration Payloads.
//!
//! `RegisterL1Validator` describes a validator joining an L1; its sha256 is
//! the validation id the validator-manager contract stores. The payload
//! travels inside an `AddressedCall` naming the contract that emitted it.
//!
//! # Wire Layout
//! ```text
//! RegisterL1Validator:
//!   version:u16 | type:u32 (1) | subnet_id[32] | node_id:bytes | bls_key[48]
//!   | expiry:u64 | remaining_balance_owner | disable_owner | weight:u64
//! PChainOwner:
//!   threshold:u32 | count:u32 | address[20] * count
//! AddressedCall:
//!   version:u16 | type:u32 (1) | source_address:bytes | payload:bytes
//! ```

use sha2::{Digest, Sha256};

use super::{WarpError, ADDRESSED_CALL_TYPE_ID, BLS_PUBLIC_KEY_LEN, REGISTER_L1_VALIDATOR_TYPE_ID};
use crate::codec::{
    expect_type, get_fixed, get_u32, get_u64, get_var_bytes, get_version, put_fixed, put_u32,
    put_u64, put_var_bytes, put_version, CodecError, WireDecode, WireEncode,
};
use crate::ids::{Id, NodeId, ShortId, SHORT_ID_LEN};

/// Addresses allowed to act for a validator on the P-Chain, with a signing
/// threshold.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PChainOwner {
    pub threshold: u32,
    pub addresses: Vec<ShortId>,
}

impl PChainOwner {
    /// Creates an owner, rejecting a threshold larger than the address set.
    pub fn new(threshold: u32, addresses: Vec<ShortId>) -> Result<Self, WarpError> {
        if threshold as usize > addresses.len() {
            return Err(WarpError::ThresholdTooHigh {
                threshold,
                addresses: addresses.len(),
            });
        }
        Ok(Self { threshold, addresses })
    }

    /// Single address, threshold one.
    pub fn single(address: ShortId) -> Self {
        Self {
            threshold: 1,
            addresses: vec![address],
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        put_u32(out, self.threshold);
        put_u32(out, self.addresses.len() as u32);
        for addr in &self.addresses {
            put_fixed(out, addr.as_bytes());
        }
    }

    fn decode(input: &mut &[u8]) -> Result<Self, CodecError> {
        let threshold = get_u32(input)?;
        let count = get_u32(input)? as usize;
        // Each address needs 20 bytes; bail before allocating for a bogus count.
        if count.saturating_mul(SHORT_ID_LEN) > input.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let mut addresses = Vec::with_capacity(count);
        for _ in 0..count {
            addresses.push(ShortId(get_fixed::<SHORT_ID_LEN>(input)?));
        }
        Ok(Self { threshold, addresses })
    }
}

/// Message asking the P-Chain to register a validator of an L1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterL1Validator {
    pub subnet_id: Id,
    pub node_id: Vec<u8>,
    pub bls_public_key: [u8; BLS_PUBLIC_KEY_LEN],
    pub expiry: u64,
    pub remaining_balance_owner: PChainOwner,
    pub disable_owner: PChainOwner,
    pub weight: u64,
}

impl RegisterL1Validator {
    /// Builds and validates a registration payload.
    ///
    /// # Errors
    /// Rejects a BLS key that is not 48 bytes, an empty owner set, a
    /// threshold above its owner set, zero expiry and zero weight.
    pub fn new(
        subnet_id: Id,
        node_id: NodeId,
        bls_public_key: &[u8],
        expiry: u64,
        remaining_balance_owner: PChainOwner,
        disable_owner: PChainOwner,
        weight: u64,
    ) -> Result<Self, WarpError> {
        let bls_public_key: [u8; BLS_PUBLIC_KEY_LEN] = bls_public_key
            .try_into()
            .map_err(|_| WarpError::InvalidBlsKeyLength(bls_public_key.len()))?;
        let payload = Self {
            subnet_id,
            node_id: node_id.as_bytes().to_vec(),
            bls_public_key,
            expiry,
            remaining_balance_owner,
            disable_owner,
            weight,
        };
        payload.validate()?;
        Ok(payload)
    }

    /// Checks the invariants the P-Chain enforces on this payload.
    pub fn validate(&self) -> Result<(), WarpError> {
        if self.node_id.is_empty() {
            return Err(WarpError::EmptyNodeId);
        }
        if self.expiry == 0 {
            return Err(WarpError::ZeroExpiry);
        }
        if self.weight == 0 {
            return Err(WarpError::ZeroWeight);
        }
        for (name, owner) in [
            ("remaining balance", &self.remaining_balance_owner),
            ("disable", &self.disable_owner),
        ] {
            if owner.addresses.is_empty() {
                return Err(WarpError::EmptyOwnerSet(name));
            }
            if owner.threshold as usize > owner.addresses.len() {
                return Err(WarpError::ThresholdTooHigh {
                    threshold: owner.threshold,
                    addresses: owner.addresses.len(),
                });
            }
        }
        Ok(())
    }

    /// The validation id: sha256 over the encoded payload.
    ///
    /// Must agree bit-for-bit with the contract, which hashes the same bytes.
    pub fn validation_id(&self) -> Id {
        Id(Sha256::digest(self.to_bytes()).into())
    }
}

impl WireEncode for RegisterL1Validator {
    fn encode(&self, out: &mut Vec<u8>) {
        put_version(out);
        put_u32(out, REGISTER_L1_VALIDATOR_TYPE_ID);
        put_fixed(out, self.subnet_id.as_bytes());
        put_var_bytes(out, &self.node_id);
        put_fixed(out, &self.bls_public_key);
        put_u64(out, self.expiry);
        self.remaining_balance_owner.encode(out);
        self.disable_owner.encode(out);
        put_u64(out, self.weight);
    }
}

impl WireDecode for RegisterL1Validator {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError> {
        get_version(input)?;
        expect_type(input, REGISTER_L1_VALIDATOR_TYPE_ID)?;
        Ok(Self {
            subnet_id: Id(get_fixed(input)?),
            node_id: get_var_bytes(input)?,
            bls_public_key: get_fixed(input)?,
            expiry: get_u64(input)?,
            remaining_balance_owner: PChainOwner::decode(input)?,
            disable_owner: PChainOwner::decode(input)?,
            weight: get_u64(input)?,
        })
    }
}

/// Payload tagged with the address of the contract that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressedCall {
    pub source_address: Vec<u8>,
    pub payload: Vec<u8>,
}

impl WireEncode for AddressedCall {
    fn encode(&self, out: &mut Vec<u8>) {
        put_version(out);
        put_u32(out, ADDRESSED_CALL_TYPE_ID);
        put_var_bytes(out, &self.source_address);
        put_var_bytes(out, &self.payload);
    }
}

impl WireDecode for AddressedCall {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError> {
        get_version(input)?;
        expect_type(input, ADDRESSED_CALL_TYPE_ID)?;
        Ok(Self {
            source_address: get_var_bytes(input)?,
            payload: get_var_bytes(input)?,
        })
    }
}
