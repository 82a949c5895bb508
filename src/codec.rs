//! Linear wire codec.
//!
//! Big-endian, fixed-width integers; variable-length byte strings carry a
//! `u32` length prefix; fixed arrays are written raw. Every top-level object
//! begins with a `u16` codec version.

use thiserror::Error;

/// The only codec version understood.
pub const CODEC_VERSION: u16 = 0;

/// Upper bound on a single length-prefixed field.
pub const MAX_FIELD_LEN: usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unsupported codec version {0}")]
    UnsupportedVersion(u16),
    #[error("unexpected type id {actual}, expected {expected}")]
    UnexpectedType { expected: u32, actual: u32 },
    #[error("field length {actual} exceeds maximum {max}")]
    TooLarge { actual: usize, max: usize },
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

/// Types that can be written with the linear codec.
pub trait WireEncode {
    fn encode(&self, out: &mut Vec<u8>);

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// Types that can be read with the linear codec.
pub trait WireDecode: Sized {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError>;

    /// Decodes a complete buffer, rejecting trailing bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut input = bytes;
        let value = Self::decode(&mut input)?;
        if !input.is_empty() {
            return Err(CodecError::TrailingBytes(input.len()));
        }
        Ok(value)
    }
}

pub fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Writes raw bytes with no prefix (fixed-size arrays).
pub fn put_fixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(bytes);
}

/// Writes a `u32` length followed by the bytes.
pub fn put_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(out, len_to_u32(bytes.len()));
    out.extend_from_slice(bytes);
}

pub fn put_version(out: &mut Vec<u8>) {
    put_u16(out, CODEC_VERSION);
}

fn take<'a>(input: &mut &'a [u8], len: usize) -> Result<&'a [u8], CodecError> {
    if input.len() < len {
        return Err(CodecError::UnexpectedEof);
    }
    let (b, rest) = input.split_at(len);
    *input = rest;
    Ok(b)
}

pub fn get_u16(input: &mut &[u8]) -> Result<u16, CodecError> {
    let b = take(input, 2)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

pub fn get_u32(input: &mut &[u8]) -> Result<u32, CodecError> {
    let b = take(input, 4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

pub fn get_u64(input: &mut &[u8]) -> Result<u64, CodecError> {
    let b = take(input, 8)?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(b);
    Ok(u64::from_be_bytes(arr))
}

pub fn get_fixed<const N: usize>(input: &mut &[u8]) -> Result<[u8; N], CodecError> {
    let b = take(input, N)?;
    let mut arr = [0u8; N];
    arr.copy_from_slice(b);
    Ok(arr)
}

pub fn get_var_bytes(input: &mut &[u8]) -> Result<Vec<u8>, CodecError> {
    let len = get_u32(input)? as usize;
    if len > MAX_FIELD_LEN {
        return Err(CodecError::TooLarge { actual: len, max: MAX_FIELD_LEN });
    }
    Ok(take(input, len)?.to_vec())
}

/// Reads and checks the codec version.
pub fn get_version(input: &mut &[u8]) -> Result<(), CodecError> {
    match get_u16(input)? {
        CODEC_VERSION => Ok(()),
        other => Err(CodecError::UnsupportedVersion(other)),
    }
}

/// Reads a type id and checks it against the expected one.
pub fn expect_type(input: &mut &[u8], expected: u32) -> Result<(), CodecError> {
    let actual = get_u32(input)?;
    if actual != expected {
        return Err(CodecError::UnexpectedType { expected, actual });
    }
    Ok(())
}

/// Locally built fields never approach `u32::MAX`; saturate rather than wrap.
fn len_to_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
