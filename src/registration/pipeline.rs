//! Registration Pipeline.
//!
//! Drives one registration through every stage:
//!
//! ```text
//! CheckArtifacts -> LoadIdentity -> ResolveExpiry -> BuildMessage
//!   -> Initiate -> Aggregate -> Persist -> Complete
//! ```
//!
//! # Idempotency
//! - A stored signed message short-circuits the run: no RPC, no aggregation.
//! - Expiry and validation id are stored before the first network call, so a
//!   retry rebuilds byte-identical messages.
//! - An "already registered" revert is treated as a completed initiation.
//! - Nothing is stored on aggregation failure; the run can simply be repeated.

use crate::codec::WireEncode;
use crate::config::OnboardConfig;
use crate::evm::{EvmRpc, ReceiptPolling};
use crate::identity::IdentityStore;
use crate::ids::{Id, NodeId};
use crate::storage::{Artifact, ArtifactStore};
use crate::warp::{SignedMessage, WarpMessageBuilder};

use super::aggregator::{
    verify_signed, AggregationDeadline, AggregatorParams, CancellationToken, SignatureAggregator,
};
use super::expiry::{load_or_create_expiry, unix_now};
use super::initiator::{InitiationOutcome, ValidatorRegistrationInitiator};
use super::orchestrator::RegistrationOrchestrator;
use super::{RegistrationError, RegistrationRequest, RegistrationStage};

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReport {
    pub node_id: NodeId,
    pub validation_id: Id,
    pub expiry: u64,
    pub initiation: InitiationOutcome,
    pub signed: SignedMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A signed message was already stored; nothing was done.
    AlreadyComplete { validation_id: Option<String> },
    Registered(Box<RegistrationReport>),
}

/// The registration pipeline over its collaborators.
pub struct RegistrationPipeline<'a, S, I, R, A>
where
    S: ArtifactStore + ?Sized,
    I: IdentityStore + ?Sized,
    R: EvmRpc + ?Sized,
    A: SignatureAggregator + ?Sized,
{
    config: &'a OnboardConfig,
    store: &'a S,
    identities: &'a I,
    rpc: &'a R,
    aggregator: &'a A,
    token: CancellationToken,
}

impl<'a, S, I, R, A> RegistrationPipeline<'a, S, I, R, A>
where
    S: ArtifactStore + ?Sized,
    I: IdentityStore + ?Sized,
    R: EvmRpc + ?Sized,
    A: SignatureAggregator + ?Sized,
{
    pub fn new(
        config: &'a OnboardConfig,
        store: &'a S,
        identities: &'a I,
        rpc: &'a R,
        aggregator: &'a A,
    ) -> Self {
        Self {
            config,
            store,
            identities,
            rpc,
            aggregator,
            token: CancellationToken::new(),
        }
    }

    /// Uses `token` to cancel the aggregation wait from elsewhere.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn run(&self) -> Result<RegistrationOutcome, RegistrationError> {
        self.run_at(unix_now())
    }

    /// Runs with `now` (unix seconds) as the clock for a fresh expiry.
    pub fn run_at(&self, now: u64) -> Result<RegistrationOutcome, RegistrationError> {
        let mut orch = RegistrationOrchestrator::new();
        let mut node: Option<NodeId> = None;

        macro_rules! advance {
            () => {
                orch.advance()
                    .map_err(RegistrationError::at(orch.current_stage(), node))?
            };
        }
        macro_rules! at {
            () => {
                RegistrationError::at(orch.current_stage(), node)
            };
        }

        advance!();
        if self.store.contains(Artifact::SignedWarpMessage).map_err(at!())? {
            let validation_id = self.store.get_text(Artifact::ValidationId).map_err(at!())?;
            log::info!("Signed warp message already stored, skipping registration");
            return Ok(RegistrationOutcome::AlreadyComplete { validation_id });
        }

        advance!();
        let chain_id = self.identities.chain_id().map_err(at!())?;
        let subnet_id = self.identities.subnet_id().map_err(at!())?;
        let identity = self.identities.node_identity().map_err(at!())?;
        node = Some(identity.node_id);
        let owner = self.identities.owner_key().map_err(at!())?;
        log::info!(
            "Registering {} on chain {} (subnet {}), owner {}",
            identity.node_id,
            chain_id,
            subnet_id,
            owner.eth_address()
        );

        advance!();
        let expiry = load_or_create_expiry(
            self.store,
            now,
            self.config.registration.expiry_duration(),
        )
        .map_err(at!())?;

        advance!();
        let request = RegistrationRequest::single_owner(
            identity,
            expiry,
            self.config.registration.weight,
            owner.p_chain_address(),
        );
        let builder =
            WarpMessageBuilder::new(self.config.network_id, chain_id, self.config.addresses.proxy);
        let message = builder.build(subnet_id, &request).map_err(at!())?;
        self.store
            .put_exact(Artifact::ValidationId, message.validation_id.to_string().as_bytes())
            .map_err(at!())?;
        log::info!("Validation id {}", message.validation_id);

        advance!();
        let initiator = ValidatorRegistrationInitiator::new(
            self.rpc,
            self.config.addresses.proxy,
            ReceiptPolling::from_config(&self.config.rpc),
        );
        let initiation = initiator.initiate(&owner, &request).map_err(at!())?;

        advance!();
        let params = AggregatorParams::from_config(&self.config.aggregator, subnet_id);
        let deadline = AggregationDeadline::new(self.config.aggregator.timeout(), self.token.clone());
        // Registration messages carry no justification.
        let signed = self
            .aggregator
            .sign(&message.unsigned, &[], &params, &deadline)
            .map_err(at!())?;
        verify_signed(&message.unsigned, &signed).map_err(at!())?;
        log::info!(
            "Collected signature from {} validators",
            signed.signature.signer_count()
        );

        advance!();
        self.store
            .put_exact(
                Artifact::SignedWarpMessage,
                hex::encode(signed.to_bytes()).as_bytes(),
            )
            .map_err(at!())?;
        orch.confirm_persistence();

        advance!();
        debug_assert_eq!(orch.current_stage(), RegistrationStage::Complete);
        log::info!("Registration of {} complete", request.node.node_id);

        Ok(RegistrationOutcome::Registered(Box::new(RegistrationReport {
            node_id: request.node.node_id,
            validation_id: message.validation_id,
            expiry,
            initiation,
            signed,
        })))
    }
}
