//! Contract addressing.
//!
//! One scheme is chosen per genesis document:
//! - `WellKnown`: library and logic sit at fixed constants.
//! - `DeployerNonce`: library = CREATE(deployer, nonce), logic =
//!   CREATE(deployer, nonce + 1), i.e. where a deployer would have put them.
//!
//! The proxy and proxy admin are fixed in both schemes, since the
//! registration pipeline calls the proxy by its configured address.

use serde::{Deserialize, Serialize};

use alloy_primitives::Address;

use super::{GenesisError, LinkSubstitution};
use crate::config::WellKnownAddresses;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AddressingScheme {
    #[default]
    WellKnown,
    DeployerNonce { nonce: u64 },
}

/// Resolved addresses of every genesis contract plus the links applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDeploymentPlan {
    pub deployer: Address,
    /// Genesis nonce of the deployer: past any nonce whose CREATE address
    /// is already allocated.
    pub deployer_nonce: u64,
    pub validator_messages: Address,
    pub validator_manager: Address,
    pub proxy: Address,
    pub proxy_admin: Address,
    pub links: Vec<LinkSubstitution>,
}

impl ContractDeploymentPlan {
    /// Resolves addresses under `scheme`.
    ///
    /// # Errors
    /// `AddressCollision` if any two of the five accounts coincide.
    pub fn resolve(
        scheme: AddressingScheme,
        deployer: Address,
        well_known: &WellKnownAddresses,
    ) -> Result<Self, GenesisError> {
        let (validator_messages, validator_manager, deployer_nonce) = match scheme {
            AddressingScheme::WellKnown => (
                well_known.validator_messages,
                well_known.validator_manager,
                0,
            ),
            AddressingScheme::DeployerNonce { nonce } => (
                deployer.create(nonce),
                deployer.create(nonce.saturating_add(1)),
                nonce.saturating_add(2),
            ),
        };
        let plan = Self {
            deployer,
            deployer_nonce,
            validator_messages,
            validator_manager,
            proxy: well_known.proxy,
            proxy_admin: well_known.proxy_admin,
            links: Vec::new(),
        };
        plan.check_distinct()?;
        Ok(plan)
    }

    fn accounts(&self) -> [Address; 5] {
        [
            self.deployer,
            self.validator_messages,
            self.validator_manager,
            self.proxy,
            self.proxy_admin,
        ]
    }

    fn check_distinct(&self) -> Result<(), GenesisError> {
        let accounts = self.accounts();
        for (i, a) in accounts.iter().enumerate() {
            if accounts[i + 1..].contains(a) {
                return Err(GenesisError::AddressCollision(*a));
            }
        }
        Ok(())
    }
}
