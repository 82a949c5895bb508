//! Revert decoding.
//!
//! Revert data is either `Error(string)` / `Panic(uint256)`, decoded by
//! `alloy_sol_types`, or one of the validator-manager custom errors, matched
//! by selector. Anything else is reported as raw hex.

use alloy_primitives::Bytes;
use alloy_sol_types::{decode_revert_reason, SolError};

use super::abi;
use super::RpcError;

fn custom_errors() -> [([u8; 4], &'static str); 8] {
    [
        (abi::NodeAlreadyRegistered::SELECTOR, "node already registered"),
        (abi::InvalidNodeID::SELECTOR, "invalid node id"),
        (abi::InvalidBLSKeyLength::SELECTOR, "invalid BLS key length"),
        (abi::InvalidRegistrationExpiry::SELECTOR, "invalid registration expiry"),
        (abi::InvalidPChainOwnerThreshold::SELECTOR, "invalid P-Chain owner threshold"),
        (abi::PChainOwnerAddressesNotSorted::SELECTOR, "P-Chain owner addresses not sorted"),
        (abi::InvalidInitializationStatus::SELECTOR, "invalid initialization status"),
        (abi::OwnableUnauthorizedAccount::SELECTOR, "caller is not the owner"),
    ]
}

/// Human-readable reason for revert `data`.
pub fn decode_reason(data: &[u8]) -> String {
    if let Some(selector) = data.get(..4) {
        if let Some((_, reason)) = custom_errors().iter().find(|(s, _)| s == selector) {
            return (*reason).to_string();
        }
    }
    decode_revert_reason(data).unwrap_or_else(|| format!("0x{}", hex::encode(data)))
}

/// Maps a JSON-RPC error object to `RpcError`.
///
/// Nodes report reverts with a message mentioning "revert" and, usually, the
/// revert data as a hex string in `data`.
pub fn from_error_object(code: i64, message: &str, data: Option<&str>) -> RpcError {
    let revert_data = data
        .and_then(|d| hex::decode(d.trim_start_matches("0x")).ok())
        .filter(|d| !d.is_empty());

    match revert_data {
        Some(bytes) => RpcError::Reverted {
            reason: decode_reason(&bytes),
            data: Bytes::from(bytes),
        },
        None if message.contains("revert") => RpcError::Reverted {
            reason: message.to_string(),
            data: Bytes::new(),
        },
        None => RpcError::Server {
            code,
            message: message.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::Revert;

    #[test]
    fn test_node_already_registered() {
        let data = abi::NodeAlreadyRegistered {
            nodeID: Bytes::from(vec![1u8; 20]),
        }
        .abi_encode();
        assert_eq!(decode_reason(&data), "node already registered");

        let hex_data = format!("0x{}", hex::encode(&data));
        let err = from_error_object(3, "execution reverted", Some(&hex_data));
        assert_eq!(err.revert_reason(), Some("node already registered"));
    }

    #[test]
    fn test_error_string() {
        let data = Revert {
            reason: "Ownable: caller is not the owner".to_string(),
        }
        .abi_encode();
        assert!(decode_reason(&data).contains("caller is not the owner"));
    }

    #[test]
    fn test_unknown_selector_is_hex() {
        assert_eq!(decode_reason(&[0xde, 0xad, 0xbe, 0xef, 0x01]), "0xdeadbeef01");
    }

    #[test]
    fn test_plain_server_error() {
        let err = from_error_object(-32000, "nonce too low", None);
        assert!(matches!(err, RpcError::Server { code: -32000, .. }));
    }
}
