//! Validator-manager ABI.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{sol, SolCall};

use crate::registration::RegistrationRequest;
use crate::warp::PChainOwner as WarpOwner;

sol! {
    struct PChainOwner {
        uint32 threshold;
        address[] addresses;
    }

    struct ValidatorRegistrationInput {
        bytes nodeID;
        bytes blsPublicKey;
        uint64 registrationExpiry;
        PChainOwner remainingBalanceOwner;
        PChainOwner disableOwner;
    }

    function initializeValidatorRegistration(
        ValidatorRegistrationInput registrationInput,
        uint64 weight
    ) external returns (bytes32 validationID);

    error NodeAlreadyRegistered(bytes nodeID);
    error InvalidNodeID(bytes nodeID);
    error InvalidBLSKeyLength(uint256 length);
    error InvalidRegistrationExpiry(uint64 registrationExpiry);
    error InvalidPChainOwnerThreshold(uint256 threshold, uint256 addressesLength);
    error PChainOwnerAddressesNotSorted();
    error InvalidInitializationStatus();
    error OwnableUnauthorizedAccount(address account);
}

impl From<&WarpOwner> for PChainOwner {
    fn from(owner: &WarpOwner) -> Self {
        Self {
            threshold: owner.threshold,
            addresses: owner
                .addresses
                .iter()
                .map(|a| Address::from(*a.as_bytes()))
                .collect(),
        }
    }
}

/// Calldata of `initializeValidatorRegistration` for `request`.
pub fn initialize_validator_registration(request: &RegistrationRequest) -> Bytes {
    let call = initializeValidatorRegistrationCall {
        registrationInput: ValidatorRegistrationInput {
            nodeID: Bytes::copy_from_slice(request.node.node_id.as_bytes()),
            blsPublicKey: Bytes::copy_from_slice(&request.node.pop.public_key),
            registrationExpiry: request.expiry,
            remainingBalanceOwner: (&request.remaining_balance_owner).into(),
            disableOwner: (&request.disable_owner).into(),
        },
        weight: request.weight,
    };
    call.abi_encode().into()
}
