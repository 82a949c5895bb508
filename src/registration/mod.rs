//! Validator Registration.
//!
//! Adds a validator to a PoA L1:
//! 1. `initiator`: calls `initializeValidatorRegistration` on the manager.
//! 2. `warp`: builds the `RegisterL1Validator` message the manager emitted.
//! 3. `aggregator`: collects a quorum BLS signature over it.
//! 4. `pipeline`: persists the signed message so re-runs are no-ops.
//!
//! # Stage Ordering
//! `RegistrationOrchestrator` walks `RegistrationStage` strictly forward;
//! `Persist` cannot be left until persistence is confirmed. Every failure
//! reports the stage it happened in.

pub mod aggregator;
pub mod expiry;
pub mod initiator;
pub mod orchestrator;
pub mod pipeline;
pub mod request;
pub mod stages;

pub use aggregator::{
    verify_signed, AggregationDeadline, AggregationError, AggregatorParams, CancellationToken,
    SignatureAggregator,
};
#[cfg(feature = "http")]
pub use aggregator::HttpSignatureAggregator;
pub use expiry::load_or_create_expiry;
pub use initiator::{InitiationOutcome, ValidatorRegistrationInitiator};
pub use orchestrator::RegistrationOrchestrator;
pub use pipeline::{RegistrationOutcome, RegistrationPipeline, RegistrationReport};
pub use request::RegistrationRequest;
pub use stages::RegistrationStage;

use thiserror::Error;

use crate::evm::RpcError;
use crate::identity::IdentityError;
use crate::ids::NodeId;
use crate::storage::StorageError;
use crate::warp::WarpError;

/// What went wrong inside a stage.
#[derive(Debug, Error)]
pub enum RegistrationFailure {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Warp(#[from] WarpError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error("persistence not confirmed")]
    PersistenceUnconfirmed,
    #[error("registration already complete")]
    AlreadyComplete,
}

fn node_label(node_id: &Option<NodeId>) -> String {
    node_id.map_or_else(|| String::from("unknown node"), |n| n.to_string())
}

/// A failed registration, with the stage and node it concerned.
#[derive(Debug, Error)]
#[error("registration of {} failed during {stage}: {source}", node_label(.node_id))]
pub struct RegistrationError {
    pub stage: RegistrationStage,
    pub node_id: Option<NodeId>,
    #[source]
    pub source: RegistrationFailure,
}

impl RegistrationError {
    /// Error constructor for `map_err` at a given stage.
    pub(crate) fn at<E: Into<RegistrationFailure>>(
        stage: RegistrationStage,
        node_id: Option<NodeId>,
    ) -> impl FnOnce(E) -> RegistrationError {
        move |e| RegistrationError {
            stage,
            node_id,
            source: e.into(),
        }
    }
}
