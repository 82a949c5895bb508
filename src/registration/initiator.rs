//! On-chain registration call.

use alloy_primitives::Address;

use crate::evm::{abi, send_call, EvmRpc, ReceiptPolling, RpcError, TxReceipt};
use crate::identity::OwnerKey;

use super::RegistrationRequest;

/// Result of `initiate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiationOutcome {
    /// The transaction was mined successfully.
    Submitted(TxReceipt),
    /// The manager already knows this node; nothing was sent.
    AlreadyRegistered { reason: String },
}

/// Whether a revert reason means the node is already registered.
pub fn is_already_registered(reason: &str) -> bool {
    reason.to_ascii_lowercase().contains("already registered")
}

/// Submits `initializeValidatorRegistration` to the validator manager.
pub struct ValidatorRegistrationInitiator<'a, R: EvmRpc + ?Sized> {
    rpc: &'a R,
    manager: Address,
    polling: ReceiptPolling,
}

impl<'a, R: EvmRpc + ?Sized> ValidatorRegistrationInitiator<'a, R> {
    pub fn new(rpc: &'a R, manager: Address, polling: ReceiptPolling) -> Self {
        Self {
            rpc,
            manager,
            polling,
        }
    }

    /// Sends the registration call signed by `owner`.
    ///
    /// # Errors
    /// Every failure except an "already registered" revert.
    pub fn initiate(
        &self,
        owner: &OwnerKey,
        request: &RegistrationRequest,
    ) -> Result<InitiationOutcome, RpcError> {
        let data = abi::initialize_validator_registration(request);
        match send_call(self.rpc, owner, self.manager, data, self.polling) {
            Ok(receipt) => {
                log::info!(
                    "Validator registration initialized for {}: {}",
                    request.node.node_id,
                    receipt.tx_hash
                );
                Ok(InitiationOutcome::Submitted(receipt))
            }
            Err(RpcError::Reverted { reason, .. }) if is_already_registered(&reason) => {
                log::info!(
                    "Node {} was already registered ({}), continuing",
                    request.node.node_id,
                    reason
                );
                Ok(InitiationOutcome::AlreadyRegistered { reason })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_registered_matching() {
        assert!(is_already_registered("node already registered"));
        assert!(is_already_registered("revert: Node Already Registered"));
        assert!(!is_already_registered("invalid registration expiry"));
    }
}
