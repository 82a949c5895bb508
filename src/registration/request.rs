//! Registration request.

use crate::identity::NodeIdentity;
use crate::ids::ShortId;
use crate::warp::PChainOwner;

/// Everything needed to register one validator.
///
/// `expiry` comes from the persisted expiry artifact, so a retried
/// registration reproduces the same payload and validation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub node: NodeIdentity,
    /// Unix seconds after which the P-Chain rejects the registration.
    pub expiry: u64,
    pub weight: u64,
    pub remaining_balance_owner: PChainOwner,
    pub disable_owner: PChainOwner,
}

impl RegistrationRequest {
    /// Request where one P-Chain address owns both the remaining balance and
    /// the right to disable the validator.
    pub fn single_owner(node: NodeIdentity, expiry: u64, weight: u64, owner: ShortId) -> Self {
        let owners = PChainOwner::single(owner);
        Self {
            node,
            expiry,
            weight,
            remaining_balance_owner: owners.clone(),
            disable_owner: owners,
        }
    }
}
