//! Genesis allocation builder.

use std::collections::BTreeMap;
use std::path::PathBuf;

use alloy_primitives::{Address, Bytes, B256, U256};
use k256::ecdsa::VerifyingKey;

use super::addressing::ContractDeploymentPlan;
use super::linker::{LibraryLink, UnlinkedBytecode};
use super::proxy::{address_word, ADMIN_SLOT, IMPLEMENTATION_SLOT, OWNER_SLOT};
use super::types::{ChainConfig, Genesis, GenesisAccount, WarpConfig};
use super::GenesisError;
use crate::config::{ContractPaths, OnboardConfig};
use crate::identity::eth_address_from_public_key;
use crate::storage::raw_files::write_atomic;

/// Balance of the deployer: 10 native tokens (10 * 10^18).
pub const DEPLOYER_BALANCE: U256 = U256::from_limbs([10_000_000_000_000_000_000, 0, 0, 0]);

/// Nonce of every pre-deployed contract.
pub const CONTRACT_NONCE: u64 = 1;

/// Deployed bytecode of the four genesis contracts.
#[derive(Debug, Clone)]
pub struct GenesisArtifacts {
    pub validator_messages: UnlinkedBytecode,
    pub validator_manager: UnlinkedBytecode,
    pub proxy_admin: UnlinkedBytecode,
    pub transparent_proxy: UnlinkedBytecode,
}

impl GenesisArtifacts {
    /// Loads every artifact; any missing or unreadable file is fatal.
    pub fn load(paths: &ContractPaths) -> Result<Self, GenesisError> {
        Ok(Self {
            validator_messages: UnlinkedBytecode::load(&paths.validator_messages)?,
            validator_manager: UnlinkedBytecode::load(&paths.validator_manager)?,
            proxy_admin: UnlinkedBytecode::load(&paths.proxy_admin)?,
            transparent_proxy: UnlinkedBytecode::load(&paths.transparent_proxy)?,
        })
    }
}

fn contract(code: Vec<u8>, storage: BTreeMap<B256, B256>) -> GenesisAccount {
    GenesisAccount {
        balance: U256::ZERO,
        code: Bytes::from(code),
        nonce: CONTRACT_NONCE,
        storage,
    }
}

/// Builds the L1 genesis document.
pub struct GenesisAllocationBuilder<'a> {
    config: &'a OnboardConfig,
}

impl<'a> GenesisAllocationBuilder<'a> {
    pub fn new(config: &'a OnboardConfig) -> Self {
        Self { config }
    }

    /// Assembles the genesis document.
    ///
    /// Pure: the same key, timestamp and artifacts always give the same
    /// document.
    ///
    /// # Arguments
    /// * `deployer_public_key` - SEC1 secp256k1 public key (compressed or not)
    ///   of the account that owns the proxy admin.
    /// * `timestamp` - genesis timestamp, also the warp activation time.
    pub fn build(
        &self,
        deployer_public_key: &[u8],
        timestamp: u64,
        artifacts: &GenesisArtifacts,
    ) -> Result<(Genesis, ContractDeploymentPlan), GenesisError> {
        let deployer = Self::deployer_address(deployer_public_key)?;
        let mut plan = ContractDeploymentPlan::resolve(
            self.config.addressing,
            deployer,
            &self.config.addresses,
        )?;

        let library_code = artifacts.validator_messages.code()?;
        let (manager_code, links) = artifacts.validator_manager.link(&[LibraryLink {
            name: self.config.contracts.library_name.clone(),
            address: plan.validator_messages,
        }])?;
        plan.links = links;
        let admin_code = artifacts.proxy_admin.code()?;
        let proxy_code = artifacts.transparent_proxy.code()?;

        let mut chain = ChainConfig::all_forks_at_genesis(self.config.evm_chain_id);
        chain.warp_config = Some(WarpConfig::activated_at(timestamp));
        let mut genesis = Genesis::new(chain, timestamp);

        genesis.alloc.insert(
            deployer,
            GenesisAccount {
                balance: DEPLOYER_BALANCE,
                nonce: plan.deployer_nonce,
                ..GenesisAccount::default()
            },
        );
        genesis
            .alloc
            .insert(plan.validator_messages, contract(library_code, BTreeMap::new()));
        genesis
            .alloc
            .insert(plan.validator_manager, contract(manager_code, BTreeMap::new()));
        genesis.alloc.insert(
            plan.proxy_admin,
            contract(
                admin_code,
                BTreeMap::from([(OWNER_SLOT, address_word(deployer))]),
            ),
        );
        genesis.alloc.insert(
            plan.proxy,
            contract(
                proxy_code,
                BTreeMap::from([
                    (IMPLEMENTATION_SLOT, address_word(plan.validator_manager)),
                    (ADMIN_SLOT, address_word(plan.proxy_admin)),
                ]),
            ),
        );

        log::info!(
            "Genesis: deployer {}, library {}, logic {}, proxy {}, proxy admin {}",
            plan.deployer,
            plan.validator_messages,
            plan.validator_manager,
            plan.proxy,
            plan.proxy_admin
        );
        Ok((genesis, plan))
    }

    /// Writes `genesis` to the configured output path, atomically.
    pub fn write(&self, genesis: &Genesis) -> Result<PathBuf, GenesisError> {
        let json = genesis.to_canonical_json()?;
        let path = self.config.genesis_output.clone();
        write_atomic(&path, json.as_bytes())?;
        log::info!("Wrote genesis to {}", path.display());
        Ok(path)
    }

    /// Deployer address for a public key, as `build` derives it.
    pub fn deployer_address(deployer_public_key: &[u8]) -> Result<Address, GenesisError> {
        let key = VerifyingKey::from_sec1_bytes(deployer_public_key)
            .map_err(|_| GenesisError::InvalidPublicKey)?;
        Ok(eth_address_from_public_key(
            key.to_encoded_point(false).as_bytes(),
        ))
    }
}
