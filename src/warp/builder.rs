//! Registration message builder.
//!
//! Turns a `RegistrationRequest` into the exact bytes the validator-manager
//! contract emits for the same registration, so the aggregated signature is
//! accepted by the P-Chain.

use alloy_primitives::Address;

use super::{AddressedCall, RegisterL1Validator, UnsignedMessage, WarpError};
use crate::codec::WireEncode;
use crate::ids::Id;
use crate::registration::RegistrationRequest;

/// All artifacts derived from one registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationMessage {
    pub payload: RegisterL1Validator,
    pub validation_id: Id,
    pub addressed_call: AddressedCall,
    pub unsigned: UnsignedMessage,
}

/// Builds registration messages for one (network, chain, manager) triple.
#[derive(Debug, Clone)]
pub struct WarpMessageBuilder {
    network_id: u32,
    source_chain_id: Id,
    manager_address: Address,
}

impl WarpMessageBuilder {
    pub fn new(network_id: u32, source_chain_id: Id, manager_address: Address) -> Self {
        Self {
            network_id,
            source_chain_id,
            manager_address,
        }
    }

    /// Encodes the `RegisterL1Validator` payload for `request`.
    pub fn payload(
        &self,
        subnet_id: Id,
        request: &RegistrationRequest,
    ) -> Result<RegisterL1Validator, WarpError> {
        RegisterL1Validator::new(
            subnet_id,
            request.node.node_id,
            &request.node.pop.public_key,
            request.expiry,
            request.remaining_balance_owner.clone(),
            request.disable_owner.clone(),
            request.weight,
        )
    }

    /// Builds the payload, validation id and both envelopes.
    ///
    /// # Errors
    /// Fails on malformed input before anything leaves the process.
    pub fn build(
        &self,
        subnet_id: Id,
        request: &RegistrationRequest,
    ) -> Result<RegistrationMessage, WarpError> {
        let payload = self.payload(subnet_id, request)?;
        Ok(self.wrap(payload))
    }

    /// Wraps an already validated payload.
    pub fn wrap(&self, payload: RegisterL1Validator) -> RegistrationMessage {
        let validation_id = payload.validation_id();
        let addressed_call = AddressedCall {
            source_address: self.manager_address.as_slice().to_vec(),
            payload: payload.to_bytes(),
        };
        let unsigned = UnsignedMessage {
            network_id: self.network_id,
            source_chain_id: self.source_chain_id,
            payload: addressed_call.to_bytes(),
        };
        RegistrationMessage {
            payload,
            validation_id,
            addressed_call,
            unsigned,
        }
    }
}
