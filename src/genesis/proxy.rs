//! EIP-1967 proxy storage.

use alloy_primitives::{b256, Address, B256};

/// `keccak256("eip1967.proxy.implementation") - 1`.
pub const IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// `keccak256("eip1967.proxy.admin") - 1`.
pub const ADMIN_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// Slot of `Ownable._owner` in the proxy admin.
pub const OWNER_SLOT: B256 = B256::ZERO;

/// Left-pads an address into a storage word.
pub fn address_word(address: Address) -> B256 {
    address.into_word()
}
