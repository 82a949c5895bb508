//! Legacy (EIP-155) transactions.
//!
//! ```text
//! signing hash = keccak256(rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]))
//! raw          = rlp([nonce, gasPrice, gas, to, value, data, v, r, s])
//! v            = recovery_id + 35 + 2 * chainId
//! ```
//! Integers are RLP-encoded as minimal big-endian byte strings.

use std::thread;
use std::time::{Duration, Instant};

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use rlp::RlpStream;

use super::{CallRequest, EvmRpc, RpcError, TxReceipt};
use crate::identity::OwnerKey;

fn trimmed(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

fn append_uint(stream: &mut RlpStream, be_bytes: &[u8]) {
    stream.append(&trimmed(be_bytes));
}

/// `recovery_id + 35 + 2 * chain_id`, or an error when it overflows `u64`.
fn eip155_v(recovery_id: u8, chain_id: u64) -> Result<u64, RpcError> {
    chain_id
        .checked_mul(2)
        .and_then(|v| v.checked_add(35 + u64::from(recovery_id)))
        .ok_or_else(|| {
            RpcError::InvalidResponse(format!("chain id {chain_id} too large for EIP-155"))
        })
}

/// An unsigned legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

/// RLP bytes ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub hash: B256,
}

impl LegacyTransaction {
    fn append_body(&self, stream: &mut RlpStream) {
        append_uint(stream, &self.nonce.to_be_bytes());
        append_uint(stream, &self.gas_price.to_be_bytes());
        append_uint(stream, &self.gas_limit.to_be_bytes());
        stream.append(&self.to.to_vec());
        append_uint(stream, &self.value.to_be_bytes::<32>());
        stream.append(&self.data.to_vec());
    }

    /// EIP-155 signing hash.
    pub fn signing_hash(&self) -> B256 {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        append_uint(&mut stream, &self.chain_id.to_be_bytes());
        append_uint(&mut stream, &[]);
        append_uint(&mut stream, &[]);
        keccak256(stream.out())
    }

    pub fn sign(&self, key: &OwnerKey) -> Result<SignedTransaction, RpcError> {
        let hash = self.signing_hash();
        let (signature, recovery_id) = key
            .signing_key()
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|e| RpcError::Signing(e.to_string()))?;

        let v = eip155_v(recovery_id.to_byte(), self.chain_id)?;
        let rs = signature.to_bytes();

        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        append_uint(&mut stream, &v.to_be_bytes());
        append_uint(&mut stream, &rs[..32]);
        append_uint(&mut stream, &rs[32..]);
        let raw = stream.out().to_vec();

        Ok(SignedTransaction {
            hash: keccak256(&raw),
            raw,
        })
    }
}

/// How long and how often to wait for a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptPolling {
    pub timeout: Duration,
    pub interval: Duration,
}

impl ReceiptPolling {
    pub fn from_config(rpc: &crate::config::RpcConfig) -> Self {
        Self {
            timeout: rpc.receipt_timeout(),
            interval: rpc.receipt_poll_interval(),
        }
    }
}

/// Signs and submits a call to `to`, then waits for its receipt.
///
/// Gas is estimated first, so a reverting call fails with
/// `RpcError::Reverted` before anything is broadcast.
pub fn send_call<R: EvmRpc + ?Sized>(
    rpc: &R,
    key: &OwnerKey,
    to: Address,
    data: Bytes,
    polling: ReceiptPolling,
) -> Result<TxReceipt, RpcError> {
    let from = key.eth_address();
    let chain_id = rpc.chain_id()?;
    let nonce = rpc.pending_nonce(from)?;
    let gas_price = rpc.gas_price()?;
    let estimate = rpc.estimate_gas(&CallRequest {
        from,
        to,
        data: data.clone(),
    })?;

    let tx = LegacyTransaction {
        chain_id,
        nonce,
        gas_price,
        // 20% headroom over the estimate.
        gas_limit: estimate.saturating_add(estimate / 5),
        to,
        value: U256::ZERO,
        data,
    };
    let signed = tx.sign(key)?;
    let hash = rpc.send_raw_transaction(&signed.raw)?;
    if hash != signed.hash {
        log::warn!("Node returned hash {} for transaction {}", hash, signed.hash);
    }
    log::info!("Submitted transaction {} (nonce {}, gas {})", hash, nonce, tx.gas_limit);

    wait_for_receipt(rpc, hash, polling)
}

/// Polls for a receipt until it arrives or `polling.timeout` elapses.
pub fn wait_for_receipt<R: EvmRpc + ?Sized>(
    rpc: &R,
    hash: B256,
    polling: ReceiptPolling,
) -> Result<TxReceipt, RpcError> {
    let started = Instant::now();
    loop {
        if let Some(receipt) = rpc.transaction_receipt(hash)? {
            if !receipt.status {
                return Err(RpcError::TxFailed(hash));
            }
            log::info!("Transaction {} included in block {}", hash, receipt.block_number);
            return Ok(receipt);
        }
        let waited = started.elapsed();
        if waited >= polling.timeout {
            return Err(RpcError::ReceiptTimeout { hash, waited });
        }
        thread::sleep(polling.interval);
    }
}
