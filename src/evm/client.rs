//! Blocking JSON-RPC client.

use std::cell::Cell;
use std::time::Duration;

use alloy_primitives::{Address, B256, U128, U64};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::revert::from_error_object;
use super::{CallRequest, EvmRpc, RpcError, TxReceipt};

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Receipt fields; quantities arrive as `0x` hex strings.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptJson {
    transaction_hash: B256,
    block_number: U64,
    status: U64,
}

impl From<ReceiptJson> for TxReceipt {
    fn from(r: ReceiptJson) -> Self {
        TxReceipt {
            tx_hash: r.transaction_hash,
            block_number: r.block_number.to::<u64>(),
            status: r.status.to::<u64>() == 1,
        }
    }
}

/// JSON-RPC 2.0 client over HTTP.
pub struct JsonRpcClient {
    url: String,
    client: Client,
    next_id: Cell<u64>,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: Cell::new(1),
        })
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        log::debug!("rpc {} -> {}", method, self.url);

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|e| RpcError::Transport(format!("{method}: {e}")))?;
        if !resp.status().is_success() {
            return Err(RpcError::Transport(format!("{method}: HTTP {}", resp.status())));
        }

        let parsed: RpcResponse = resp
            .json()
            .map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")))?;
        if let Some(err) = parsed.error {
            let data = err.data.as_ref().and_then(Value::as_str);
            return Err(from_error_object(err.code, &err.message, data));
        }
        serde_json::from_value(parsed.result)
            .map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")))
    }
}

impl EvmRpc for JsonRpcClient {
    fn chain_id(&self) -> Result<u64, RpcError> {
        let id: U64 = self.call("eth_chainId", json!([]))?;
        Ok(id.to::<u64>())
    }

    fn pending_nonce(&self, address: Address) -> Result<u64, RpcError> {
        let nonce: U64 = self.call("eth_getTransactionCount", json!([address, "pending"]))?;
        Ok(nonce.to::<u64>())
    }

    fn gas_price(&self) -> Result<u128, RpcError> {
        let price: U128 = self.call("eth_gasPrice", json!([]))?;
        Ok(price.to::<u128>())
    }

    fn estimate_gas(&self, call: &CallRequest) -> Result<u64, RpcError> {
        let gas: U64 = self.call(
            "eth_estimateGas",
            json!([{ "from": call.from, "to": call.to, "data": call.data }]),
        )?;
        Ok(gas.to::<u64>())
    }

    fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, RpcError> {
        self.call(
            "eth_sendRawTransaction",
            json!([format!("0x{}", hex::encode(raw))]),
        )
    }

    fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        let receipt: Option<ReceiptJson> = self.call("eth_getTransactionReceipt", json!([hash]))?;
        Ok(receipt.map(TxReceipt::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_quantities() {
        let receipt: ReceiptJson = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "blockNumber": "0x2a",
            "status": "0x1",
            "gasUsed": "0x5208"
        }))
        .unwrap();
        let receipt = TxReceipt::from(receipt);
        assert_eq!(receipt.block_number, 42);
        assert!(receipt.status);

        assert!(serde_json::from_value::<U64>(json!("0x1ffffffffffffffff")).is_err());
        assert!(serde_json::from_value::<U128>(json!("0x5d21dba000")).is_ok());
    }

    #[test]
    fn test_unreachable_node_is_transport_error() {
        let client =
            JsonRpcClient::new("http://127.0.0.1:1/ext/bc/x/rpc", Duration::from_secs(1)).unwrap();
        assert!(matches!(client.chain_id(), Err(RpcError::Transport(_))));
    }
}
