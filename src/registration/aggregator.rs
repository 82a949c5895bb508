//! Signature Aggregation.
//!
//! Collecting BLS signatures from the L1's validators happens outside this
//! crate; `SignatureAggregator` is the seam. The call blocks until a quorum
//! signature is available, the deadline passes, or the token is cancelled.
//!
//! # Acceptance
//! Whatever an aggregator returns is checked with `verify_signed` before it
//! is persisted: it must sign exactly the requested unsigned message and carry
//! at least one signer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::AggregatorConfig;
use crate::ids::Id;
use crate::warp::{SignedMessage, UnsignedMessage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("aggregation cancelled")]
    Cancelled,
    #[error("aggregation deadline exceeded")]
    DeadlineExceeded,
    #[error("quorum not reached: {0}")]
    QuorumNotReached(String),
    #[error("aggregator unreachable: {0}")]
    Transport(String),
    #[error("invalid aggregator response: {0}")]
    InvalidResponse(String),
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Deadline plus cancellation token handed to an aggregator.
#[derive(Debug, Clone)]
pub struct AggregationDeadline {
    deadline: Instant,
    token: CancellationToken,
}

impl AggregationDeadline {
    pub fn new(timeout: Duration, token: CancellationToken) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            token,
        }
    }

    /// Time left, or `None` once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fails if cancelled or past the deadline.
    pub fn check(&self) -> Result<(), AggregationError> {
        if self.token.is_cancelled() {
            return Err(AggregationError::Cancelled);
        }
        if self.remaining().is_none() {
            return Err(AggregationError::DeadlineExceeded);
        }
        Ok(())
    }
}

/// Parameters of one aggregation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorParams {
    /// Subnet whose validators must sign.
    pub subnet_id: Id,
    /// Required stake percentage; 0 means the aggregator's default.
    pub quorum_percentage: u32,
    pub peers: Vec<String>,
    pub log_level: String,
    pub allow_private_ips: bool,
}

impl AggregatorParams {
    pub fn from_config(config: &AggregatorConfig, subnet_id: Id) -> Self {
        Self {
            subnet_id,
            quorum_percentage: config.quorum_percentage,
            peers: config.peers.clone(),
            log_level: config.log_level.clone(),
            allow_private_ips: config.allow_private_ips,
        }
    }
}

/// Collects a quorum signature over a warp message.
pub trait SignatureAggregator {
    fn sign(
        &self,
        unsigned: &UnsignedMessage,
        justification: &[u8],
        params: &AggregatorParams,
        deadline: &AggregationDeadline,
    ) -> Result<SignedMessage, AggregationError>;
}

/// Checks that `signed` is a usable signature over `unsigned`.
pub fn verify_signed(
    unsigned: &UnsignedMessage,
    signed: &SignedMessage,
) -> Result<(), AggregationError> {
    if &signed.unsigned != unsigned {
        return Err(AggregationError::InvalidResponse(format!(
            "signed message {} does not match requested {}",
            signed.unsigned.id(),
            unsigned.id()
        )));
    }
    if signed.signature.signer_count() == 0 {
        return Err(AggregationError::QuorumNotReached(String::from(
            "signature has no signers",
        )));
    }
    Ok(())
}

#[cfg(feature = "http")]
pub use http::HttpSignatureAggregator;

#[cfg(feature = "http")]
mod http {
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::thread;

    use reqwest::blocking::Client;
    use reqwest::StatusCode;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::codec::{WireDecode, WireEncode};

    /// How often the token is checked while a request is in flight.
    const CANCEL_POLL: Duration = Duration::from_millis(50);

    #[derive(Serialize)]
    struct AggregateRequest {
        message: String,
        justification: String,
        #[serde(rename = "signing-subnet-id")]
        signing_subnet_id: String,
        #[serde(rename = "quorum-percentage")]
        quorum_percentage: u32,
    }

    #[derive(Deserialize)]
    struct AggregateResponse {
        #[serde(rename = "signed-message")]
        signed_message: String,
    }

    fn transport_error(e: reqwest::Error) -> AggregationError {
        if e.is_timeout() {
            AggregationError::DeadlineExceeded
        } else {
            AggregationError::Transport(e.to_string())
        }
    }

    /// Client of a signature-aggregator service (`POST /aggregate-signatures`).
    ///
    /// The request runs on a worker thread so that cancellation takes effect
    /// while it is in flight. An abandoned worker ends at the request timeout.
    pub struct HttpSignatureAggregator {
        url: String,
        client: Client,
    }

    impl HttpSignatureAggregator {
        pub fn new(url: impl Into<String>) -> Result<Self, AggregationError> {
            let client = Client::builder()
                .build()
                .map_err(|e| AggregationError::Transport(e.to_string()))?;
            Ok(Self {
                url: url.into(),
                client,
            })
        }

        /// Sends `body` and waits for the status and response text.
        fn post(
            &self,
            body: &AggregateRequest,
            deadline: &AggregationDeadline,
        ) -> Result<(StatusCode, String), AggregationError> {
            let timeout = deadline
                .remaining()
                .ok_or(AggregationError::DeadlineExceeded)?;
            let request = self.client.post(&self.url).timeout(timeout).json(body);

            let (tx, rx) = mpsc::channel();
            thread::Builder::new()
                .name(String::from("aggregator-request"))
                .spawn(move || {
                    let reply = request.send().and_then(|resp| {
                        let status = resp.status();
                        resp.text().map(|text| (status, text))
                    });
                    // The receiver is gone once the caller gave up.
                    let _ = tx.send(reply);
                })
                .map_err(|e| AggregationError::Transport(e.to_string()))?;

            loop {
                match rx.recv_timeout(CANCEL_POLL) {
                    Ok(reply) => return reply.map_err(transport_error),
                    Err(RecvTimeoutError::Timeout) => deadline.check()?,
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(AggregationError::Transport(String::from(
                            "request worker exited without a reply",
                        )))
                    }
                }
            }
        }
    }

    impl SignatureAggregator for HttpSignatureAggregator {
        fn sign(
            &self,
            unsigned: &UnsignedMessage,
            justification: &[u8],
            params: &AggregatorParams,
            deadline: &AggregationDeadline,
        ) -> Result<SignedMessage, AggregationError> {
            deadline.check()?;
            log::debug!(
                "Aggregating via {} (peers {:?}, private IPs {}, log level {})",
                self.url,
                params.peers,
                params.allow_private_ips,
                params.log_level
            );

            let body = AggregateRequest {
                message: hex::encode(unsigned.to_bytes()),
                justification: hex::encode(justification),
                signing_subnet_id: params.subnet_id.to_string(),
                quorum_percentage: params.quorum_percentage,
            };
            let (status, text) = self.post(&body, deadline)?;
            if !status.is_success() {
                return Err(AggregationError::QuorumNotReached(format!(
                    "HTTP {status}: {}",
                    text.trim()
                )));
            }

            let parsed: AggregateResponse = serde_json::from_str(&text)
                .map_err(|e| AggregationError::InvalidResponse(e.to_string()))?;
            let bytes = hex::decode(parsed.signed_message.trim_start_matches("0x"))
                .map_err(|e| AggregationError::InvalidResponse(e.to_string()))?;
            let signed = SignedMessage::from_bytes(&bytes)
                .map_err(|e| AggregationError::InvalidResponse(e.to_string()))?;
            verify_signed(unsigned, &signed)?;
            Ok(signed)
        }
    }
}
