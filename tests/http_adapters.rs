//! The `reqwest` adapters against a local HTTP stub: the JSON-RPC client, the
//! signature-aggregator client, and a full pipeline run over both.

#![cfg(feature = "http")]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolError;
use serde_json::{json, Value};

use poa_onboard::codec::{WireDecode, WireEncode};
use poa_onboard::config::OnboardConfig;
use poa_onboard::evm::{abi, CallRequest, EvmRpc, JsonRpcClient, RpcError};
use poa_onboard::identity::{ArtifactIdentityStore, ProofOfPossession};
use poa_onboard::ids::{Id, NodeId, SHORT_ID_LEN};
use poa_onboard::registration::{
    AggregationDeadline, AggregationError, AggregatorParams, CancellationToken,
    HttpSignatureAggregator, RegistrationFailure, RegistrationOutcome, RegistrationPipeline,
    RegistrationStage, SignatureAggregator,
};
use poa_onboard::storage::{Artifact, ArtifactStore, MemoryArtifactStore};
use poa_onboard::warp::{
    BitSetSignature, SignedMessage, UnsignedMessage, BLS_PUBLIC_KEY_LEN, BLS_SIGNATURE_LEN,
};

const NOW: u64 = 1_700_000_000;
const OWNER_HEX: &str = "1111111111111111111111111111111111111111111111111111111111111111";
const TX_HASH: &str = "0xabababababababababababababababababababababababababababababababab";

/// What the stub does with one request.
enum Reply {
    Json(u16, Value),
    /// Accept the request and never answer.
    Hang,
}

/// One-thread-per-connection HTTP/1.1 server answering JSON bodies.
struct Stub {
    url: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl Stub {
    fn serve<F>(respond: F) -> Stub
    where
        F: Fn(&Value) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let respond = Arc::new(respond);

        let seen = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let respond = Arc::clone(&respond);
                let seen = Arc::clone(&seen);
                thread::spawn(move || handle(stream, respond.as_ref(), &seen));
            }
        });
        Stub { url, requests }
    }

    fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

fn handle<F: Fn(&Value) -> Reply>(mut stream: TcpStream, respond: &F, seen: &Mutex<Vec<Value>>) {
    let body = match read_body(&stream) {
        Ok(body) => body,
        Err(_) => return,
    };
    seen.lock().unwrap().push(body.clone());
    match respond(&body) {
        Reply::Json(status, value) => {
            let text = value.to_string();
            let head = format!(
                "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                text.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(text.as_bytes());
        }
        Reply::Hang => thread::sleep(Duration::from_secs(30)),
    }
}

fn read_body(stream: &TcpStream) -> std::io::Result<Value> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut len = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                len = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    Ok(serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn rpc_result(request: &Value, result: Value) -> Reply {
    Reply::Json(
        200,
        json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
    )
}

fn rpc_error(request: &Value, error: Value) -> Reply {
    Reply::Json(
        200,
        json!({ "jsonrpc": "2.0", "id": request["id"], "error": error }),
    )
}

/// A node that accepts every call and mines it in block 42.
fn healthy_node(request: &Value) -> Reply {
    let result = match request["method"].as_str().unwrap_or_default() {
        "eth_chainId" => json!("0x3039"),
        "eth_getTransactionCount" => json!("0x3"),
        "eth_gasPrice" => json!("0x5d21dba000"),
        "eth_estimateGas" => json!("0x3d090"),
        "eth_sendRawTransaction" => json!(TX_HASH),
        "eth_getTransactionReceipt" => json!({
            "transactionHash": TX_HASH,
            "blockNumber": "0x2a",
            "status": "0x1"
        }),
        _ => Value::Null,
    };
    rpc_result(request, result)
}

/// An aggregator that signs whatever it is asked to, with signers 0 and 2.
fn signing_aggregator(request: &Value) -> Reply {
    let bytes = hex::decode(request["message"].as_str().unwrap_or_default()).unwrap();
    let signed = SignedMessage {
        unsigned: UnsignedMessage::from_bytes(&bytes).unwrap(),
        signature: BitSetSignature {
            signers: vec![0b0000_0101],
            signature: [7u8; BLS_SIGNATURE_LEN],
        },
    };
    Reply::Json(
        200,
        json!({ "signed-message": format!("0x{}", hex::encode(signed.to_bytes())) }),
    )
}

fn unsigned() -> UnsignedMessage {
    UnsignedMessage {
        network_id: 5,
        source_chain_id: Id([0x01; 32]),
        payload: vec![0xAA, 0xBB],
    }
}

fn params() -> AggregatorParams {
    let mut config = OnboardConfig::default().aggregator;
    config.quorum_percentage = 67;
    AggregatorParams::from_config(&config, Id([0x02; 32]))
}

fn deadline(timeout: Duration) -> (AggregationDeadline, CancellationToken) {
    let token = CancellationToken::new();
    (AggregationDeadline::new(timeout, token.clone()), token)
}

fn client(stub: &Stub) -> JsonRpcClient {
    JsonRpcClient::new(format!("{}/ext/bc/x/rpc", stub.url), Duration::from_secs(5)).unwrap()
}

fn node_id() -> NodeId {
    NodeId([0x42; SHORT_ID_LEN])
}

fn provisioned() -> MemoryArtifactStore {
    let pop = ProofOfPossession {
        public_key: [0xB1; BLS_PUBLIC_KEY_LEN],
        signature: [0xB2; BLS_SIGNATURE_LEN],
    };
    MemoryArtifactStore::new()
        .with(Artifact::ChainId, Id([0x01; 32]).to_string())
        .with(Artifact::SubnetId, Id([0x02; 32]).to_string())
        .with(Artifact::NodeId, node_id().to_string())
        .with(Artifact::ProofOfPossession, pop.to_json())
        .with(Artifact::OwnerKey, OWNER_HEX)
}

fn config(aggregator: &Stub) -> OnboardConfig {
    let mut config = OnboardConfig::default();
    config.rpc.receipt_poll_interval_ms = 0;
    config.aggregator.url = format!("{}/aggregate-signatures", aggregator.url);
    config
}

#[test]
fn test_rpc_quantities_and_receipt() {
    let stub = Stub::serve(healthy_node);
    let rpc = client(&stub);

    assert_eq!(rpc.chain_id().unwrap(), 12345);
    assert_eq!(rpc.pending_nonce(Address::ZERO).unwrap(), 3);
    assert_eq!(rpc.gas_price().unwrap(), 400_000_000_000);

    let hash: B256 = TX_HASH.parse().unwrap();
    let receipt = rpc.transaction_receipt(hash).unwrap().unwrap();
    assert_eq!(receipt.tx_hash, hash);
    assert_eq!(receipt.block_number, 42);
    assert!(receipt.status);

    let requests = stub.requests();
    assert_eq!(requests[0]["jsonrpc"], "2.0");
    assert_eq!(requests[1]["params"][1], "pending");
    let ids: Vec<u64> = requests.iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[test]
fn test_rpc_pending_and_failed_receipts() {
    let stub = Stub::serve(|request| {
        let hash = request["params"][0].as_str().unwrap_or_default();
        if hash.ends_with("00") {
            return rpc_result(request, Value::Null);
        }
        rpc_result(
            request,
            json!({ "transactionHash": hash, "blockNumber": "0x7", "status": "0x0" }),
        )
    });
    let rpc = client(&stub);

    assert_eq!(rpc.transaction_receipt(B256::ZERO).unwrap(), None);
    let failed = rpc.transaction_receipt(B256::repeat_byte(0x11)).unwrap().unwrap();
    assert_eq!(failed.block_number, 7);
    assert!(!failed.status);
}

#[test]
fn test_rpc_revert_error_object() {
    let data = abi::NodeAlreadyRegistered {
        nodeID: Bytes::from(vec![0x42; 20]),
    }
    .abi_encode();
    let data = format!("0x{}", hex::encode(data));
    let stub = Stub::serve(move |request| match request["method"].as_str() {
        Some("eth_estimateGas") => rpc_error(
            request,
            json!({ "code": 3, "message": "execution reverted", "data": data }),
        ),
        _ => rpc_error(
            request,
            json!({ "code": -32000, "message": "nonce too low" }),
        ),
    });
    let rpc = client(&stub);

    let err = rpc
        .estimate_gas(&CallRequest {
            from: Address::ZERO,
            to: Address::repeat_byte(0x0F),
            data: Bytes::from(vec![1, 2, 3]),
        })
        .unwrap_err();
    assert_eq!(err.revert_reason(), Some("node already registered"));
    assert!(matches!(err, RpcError::Reverted { data, .. } if data.len() == 36 + 64));

    let call = &stub.requests()[0]["params"][0];
    assert_eq!(call["data"], "0x010203");
    assert_eq!(
        call["to"].as_str().unwrap().to_lowercase(),
        format!("0x{}", "0f".repeat(20))
    );

    assert!(matches!(
        rpc.chain_id(),
        Err(RpcError::Server { code: -32000, .. })
    ));
}

#[test]
fn test_aggregator_request_and_response() {
    let stub = Stub::serve(signing_aggregator);
    let aggregator = HttpSignatureAggregator::new(&stub.url).unwrap();
    let (deadline, _) = deadline(Duration::from_secs(5));

    let signed = aggregator
        .sign(&unsigned(), &[0xC0, 0xDE], &params(), &deadline)
        .unwrap();
    assert_eq!(signed.unsigned, unsigned());
    assert_eq!(signed.signature.signer_count(), 2);

    let request = &stub.requests()[0];
    assert_eq!(request["message"], hex::encode(unsigned().to_bytes()));
    assert_eq!(request["justification"], "c0de");
    assert_eq!(request["signing-subnet-id"], Id([0x02; 32]).to_string());
    assert_eq!(request["quorum-percentage"], 67);
}

#[test]
fn test_aggregator_rejects_other_message() {
    let stub = Stub::serve(|request| {
        let mut other = unsigned();
        other.payload = vec![0xEE];
        let mut forged = request.clone();
        forged["message"] = json!(hex::encode(other.to_bytes()));
        signing_aggregator(&forged)
    });
    let aggregator = HttpSignatureAggregator::new(&stub.url).unwrap();
    let (deadline, _) = deadline(Duration::from_secs(5));

    assert!(matches!(
        aggregator.sign(&unsigned(), &[], &params(), &deadline),
        Err(AggregationError::InvalidResponse(_))
    ));
}

#[test]
fn test_aggregator_error_status_is_quorum_failure() {
    let stub = Stub::serve(|_| Reply::Json(500, json!({ "error": "not enough stake" })));
    let aggregator = HttpSignatureAggregator::new(&stub.url).unwrap();
    let (deadline, _) = deadline(Duration::from_secs(5));

    match aggregator.sign(&unsigned(), &[], &params(), &deadline) {
        Err(AggregationError::QuorumNotReached(reason)) => {
            assert!(reason.contains("not enough stake"), "{reason}")
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_cancel_interrupts_request_in_flight() {
    let stub = Stub::serve(|_| Reply::Hang);
    let aggregator = HttpSignatureAggregator::new(&stub.url).unwrap();
    let (deadline, token) = deadline(Duration::from_secs(5));

    let started = Instant::now();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        token.cancel();
    });
    let result = aggregator.sign(&unsigned(), &[], &params(), &deadline);
    canceller.join().unwrap();

    assert_eq!(result, Err(AggregationError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
}

#[test]
fn test_unanswered_request_hits_deadline() {
    let stub = Stub::serve(|_| Reply::Hang);
    let aggregator = HttpSignatureAggregator::new(&stub.url).unwrap();
    let (deadline, _) = deadline(Duration::from_millis(300));

    let started = Instant::now();
    assert_eq!(
        aggregator.sign(&unsigned(), &[], &params(), &deadline),
        Err(AggregationError::DeadlineExceeded)
    );
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_pipeline_over_http() {
    let node = Stub::serve(healthy_node);
    let signer = Stub::serve(signing_aggregator);
    let config = config(&signer);
    let store = provisioned();
    let identities = ArtifactIdentityStore::new(&store);
    let rpc = client(&node);
    let aggregator = HttpSignatureAggregator::new(config.aggregator.url.clone()).unwrap();

    let outcome = RegistrationPipeline::new(&config, &store, &identities, &rpc, &aggregator)
        .run_at(NOW)
        .unwrap();
    let RegistrationOutcome::Registered(report) = outcome else {
        panic!("expected a registration");
    };
    assert_eq!(report.node_id, node_id());
    assert_eq!(
        store.get_text(Artifact::SignedWarpMessage).unwrap(),
        Some(hex::encode(report.signed.to_bytes()))
    );

    let methods: Vec<String> = node
        .requests()
        .iter()
        .map(|r| r["method"].as_str().unwrap_or_default().to_string())
        .collect();
    assert!(methods.contains(&String::from("eth_sendRawTransaction")));
    assert_eq!(methods.last().map(String::as_str), Some("eth_getTransactionReceipt"));
    assert_eq!(signer.requests().len(), 1);
}

#[test]
fn test_pipeline_cancelled_during_aggregation() {
    let node = Stub::serve(healthy_node);
    let signer = Stub::serve(|_| Reply::Hang);
    let config = config(&signer);
    let store = provisioned();
    let identities = ArtifactIdentityStore::new(&store);
    let rpc = client(&node);
    let aggregator = HttpSignatureAggregator::new(config.aggregator.url.clone()).unwrap();

    let token = CancellationToken::new();
    let remote = token.clone();
    let started = Instant::now();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        remote.cancel();
    });
    let err = RegistrationPipeline::new(&config, &store, &identities, &rpc, &aggregator)
        .with_cancellation(token)
        .run_at(NOW)
        .unwrap_err();
    canceller.join().unwrap();

    assert_eq!(err.stage, RegistrationStage::Aggregate);
    assert_eq!(err.node_id, Some(node_id()));
    assert!(matches!(
        err.source,
        RegistrationFailure::Aggregation(AggregationError::Cancelled)
    ));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!store.contains(Artifact::SignedWarpMessage).unwrap());
    assert!(store.contains(Artifact::ValidationId).unwrap());
}

#[test]
fn test_pipeline_aggregation_deadline() {
    let node = Stub::serve(healthy_node);
    let signer = Stub::serve(|_| Reply::Hang);
    let mut config = config(&signer);
    config.aggregator.timeout_secs = 1;
    let store = provisioned();
    let identities = ArtifactIdentityStore::new(&store);
    let rpc = client(&node);
    let aggregator = HttpSignatureAggregator::new(config.aggregator.url.clone()).unwrap();

    let err = RegistrationPipeline::new(&config, &store, &identities, &rpc, &aggregator)
        .run_at(NOW)
        .unwrap_err();

    assert_eq!(err.stage, RegistrationStage::Aggregate);
    assert!(matches!(
        err.source,
        RegistrationFailure::Aggregation(AggregationError::DeadlineExceeded)
    ));
    assert!(!store.contains(Artifact::SignedWarpMessage).unwrap());
}
