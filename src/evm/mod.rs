//! EVM Chain Access.
//!
//! The registration pipeline talks to the L1's EVM through `EvmRpc`, a
//! blocking JSON-RPC surface reduced to what submitting one contract call
//! needs:
//! - `abi`: validator-manager call and error definitions.
//! - `revert`: turns revert data into a readable reason.
//! - `tx`: legacy EIP-155 signing and submit-then-poll.
//! - `client`: `reqwest` implementation of `EvmRpc` (feature `http`).

pub mod abi;
pub mod revert;
pub mod tx;

#[cfg(feature = "http")]
pub mod client;

#[cfg(feature = "http")]
pub use client::JsonRpcClient;
pub use tx::{send_call, LegacyTransaction, ReceiptPolling, SignedTransaction};

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use thiserror::Error;

/// Errors raised by chain access.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request never produced a JSON-RPC response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Server { code: i64, message: String },
    /// The call reverted; `reason` is decoded from `data` when possible.
    #[error("execution reverted: {reason}")]
    Reverted { reason: String, data: Bytes },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Mined with status 0.
    #[error("transaction {0} failed on chain")]
    TxFailed(B256),
    #[error("no receipt for {hash} after {waited:?}")]
    ReceiptTimeout { hash: B256, waited: Duration },
    #[error("signing failed: {0}")]
    Signing(String),
}

impl RpcError {
    /// Revert reason, if this error is a revert.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            RpcError::Reverted { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Parameters of `eth_estimateGas`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
}

/// The parts of a receipt the pipeline reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    /// `true` when the transaction succeeded.
    pub status: bool,
}

/// Blocking JSON-RPC operations of an EVM node.
pub trait EvmRpc {
    /// `eth_chainId`.
    fn chain_id(&self) -> Result<u64, RpcError>;
    /// `eth_getTransactionCount(address, "pending")`.
    fn pending_nonce(&self, address: Address) -> Result<u64, RpcError>;
    /// `eth_gasPrice`.
    fn gas_price(&self) -> Result<u128, RpcError>;
    /// `eth_estimateGas`; a reverting call fails here with `Reverted`.
    fn estimate_gas(&self, call: &CallRequest) -> Result<u64, RpcError>;
    /// `eth_sendRawTransaction`.
    fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, RpcError>;
    /// `eth_getTransactionReceipt`; `None` while pending.
    fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, RpcError>;
}
