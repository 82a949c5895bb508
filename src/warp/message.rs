//! Warp message envelopes.
//!
//! ```text
//! UnsignedMessage: version:u16 | network_id:u32 | source_chain_id[32] | payload:bytes
//! SignedMessage:   version:u16 | <unsigned fields> | sig_type:u32 (0) | signers:bytes | signature[96]
//! ```

use sha2::{Digest, Sha256};

use super::{BIT_SET_SIGNATURE_TYPE_ID, BLS_SIGNATURE_LEN};
use crate::codec::{
    expect_type, get_fixed, get_u32, get_var_bytes, get_version, put_fixed, put_u32,
    put_var_bytes, put_version, CodecError, WireDecode, WireEncode,
};
use crate::ids::Id;

/// A message awaiting signatures from the source chain's validators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedMessage {
    pub network_id: u32,
    pub source_chain_id: Id,
    pub payload: Vec<u8>,
}

impl UnsignedMessage {
    /// sha256 over the encoded message; what signers sign over.
    pub fn id(&self) -> Id {
        Id(Sha256::digest(self.to_bytes()).into())
    }

    fn encode_fields(&self, out: &mut Vec<u8>) {
        put_u32(out, self.network_id);
        put_fixed(out, self.source_chain_id.as_bytes());
        put_var_bytes(out, &self.payload);
    }

    fn decode_fields(input: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            network_id: get_u32(input)?,
            source_chain_id: Id(get_fixed(input)?),
            payload: get_var_bytes(input)?,
        })
    }
}

impl WireEncode for UnsignedMessage {
    fn encode(&self, out: &mut Vec<u8>) {
        put_version(out);
        self.encode_fields(out);
    }
}

impl WireDecode for UnsignedMessage {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError> {
        get_version(input)?;
        Self::decode_fields(input)
    }
}

/// Aggregate BLS signature plus the bitset of validators that contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSetSignature {
    pub signers: Vec<u8>,
    pub signature: [u8; BLS_SIGNATURE_LEN],
}

impl BitSetSignature {
    /// Number of validators marked in the bitset.
    pub fn signer_count(&self) -> u32 {
        self.signers.iter().map(|b| b.count_ones()).sum()
    }
}

/// An unsigned message with its aggregate signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub unsigned: UnsignedMessage,
    pub signature: BitSetSignature,
}

impl WireEncode for SignedMessage {
    fn encode(&self, out: &mut Vec<u8>) {
        put_version(out);
        self.unsigned.encode_fields(out);
        put_u32(out, BIT_SET_SIGNATURE_TYPE_ID);
        put_var_bytes(out, &self.signature.signers);
        put_fixed(out, &self.signature.signature);
    }
}

impl WireDecode for SignedMessage {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError> {
        get_version(input)?;
        let unsigned = UnsignedMessage::decode_fields(input)?;
        expect_type(input, BIT_SET_SIGNATURE_TYPE_ID)?;
        let signers = get_var_bytes(input)?;
        let signature = get_fixed(input)?;
        Ok(Self {
            unsigned,
            signature: BitSetSignature { signers, signature },
        })
    }
}
