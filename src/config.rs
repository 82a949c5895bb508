//! Configuration management for poa-onboard.
//!
//! Defines the user-configurable settings. A config is built once (defaults,
//! or a JSON file loaded by the binary) and passed by reference to every
//! component; nothing mutates it afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::genesis::AddressingScheme;
use crate::storage::Artifact;

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardConfig {
    /// Directory holding every persisted artifact.
    pub data_dir: PathBuf,

    /// File names of the artifact slots, relative to `data_dir`.
    pub artifacts: ArtifactLayout,

    /// Compiled contract inputs of the genesis builder.
    pub contracts: ContractPaths,

    /// Where the genesis document is written.
    pub genesis_output: PathBuf,

    /// Fixed contract addresses.
    pub addresses: WellKnownAddresses,

    /// How library and logic addresses are chosen in genesis.
    pub addressing: AddressingScheme,

    /// EVM chain id written into the genesis chain config.
    pub evm_chain_id: u64,

    /// Network id of the warp message (5 = Fuji).
    pub network_id: u32,

    pub rpc: RpcConfig,
    pub registration: RegistrationConfig,
    pub aggregator: AggregatorConfig,
}

impl Default for OnboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            artifacts: ArtifactLayout::default(),
            contracts: ContractPaths::default(),
            genesis_output: PathBuf::from("data/L1-genesis.json"),
            addresses: WellKnownAddresses::default(),
            addressing: AddressingScheme::default(),
            evm_chain_id: 12345,
            network_id: 5,
            rpc: RpcConfig::default(),
            registration: RegistrationConfig::default(),
            aggregator: AggregatorConfig::default(),
        }
    }
}

impl OnboardConfig {
    /// Parses a JSON config; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Relative file name of every artifact slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactLayout {
    pub chain_id: PathBuf,
    pub subnet_id: PathBuf,
    pub node_id: PathBuf,
    pub proof_of_possession: PathBuf,
    pub expiry: PathBuf,
    pub signed_warp_message: PathBuf,
    pub validation_id: PathBuf,
    pub owner_key: PathBuf,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            chain_id: PathBuf::from("chain_id.txt"),
            subnet_id: PathBuf::from("subnet_id.txt"),
            node_id: PathBuf::from("new_validator/node_id.txt"),
            proof_of_possession: PathBuf::from("new_validator/pop.json"),
            expiry: PathBuf::from("add_validator_expiry.txt"),
            signed_warp_message: PathBuf::from("add_validator_warp_message.txt"),
            validation_id: PathBuf::from("add_validator_validation_id.txt"),
            owner_key: PathBuf::from("validator_manager_owner_key.txt"),
        }
    }
}

impl ArtifactLayout {
    pub fn path(&self, artifact: Artifact) -> &Path {
        match artifact {
            Artifact::ChainId => &self.chain_id,
            Artifact::SubnetId => &self.subnet_id,
            Artifact::NodeId => &self.node_id,
            Artifact::ProofOfPossession => &self.proof_of_possession,
            Artifact::Expiry => &self.expiry,
            Artifact::SignedWarpMessage => &self.signed_warp_message,
            Artifact::ValidationId => &self.validation_id,
            Artifact::OwnerKey => &self.owner_key,
        }
    }
}

/// Compiled contract artifacts consumed by the genesis builder.
///
/// Each path is either a compiled-contract JSON (`deployedBytecode.object`)
/// or a text file holding the deployed bytecode as hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractPaths {
    pub validator_messages: PathBuf,
    pub validator_manager: PathBuf,
    pub proxy_admin: PathBuf,
    pub transparent_proxy: PathBuf,
    /// Fully-qualified name whose link placeholder is replaced with the
    /// library address.
    pub library_name: String,
}

impl Default for ContractPaths {
    fn default() -> Self {
        Self {
            validator_messages: PathBuf::from("compiled/ValidatorMessages.json"),
            validator_manager: PathBuf::from("compiled/PoAValidatorManager.json"),
            proxy_admin: PathBuf::from("proxy_compiled/deployed_proxy_admin_bytecode.txt"),
            transparent_proxy: PathBuf::from(
                "proxy_compiled/deployed_transparent_proxy_bytecode.txt",
            ),
            library_name: String::from(
                "contracts/validator-manager/ValidatorMessages.sol:ValidatorMessages",
            ),
        }
    }
}

/// Addresses baked into genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WellKnownAddresses {
    /// Transparent proxy; the address the registration pipeline calls.
    pub proxy: Address,
    pub proxy_admin: Address,
    /// Validator-manager logic behind the proxy.
    pub validator_manager: Address,
    pub validator_messages: Address,
}

impl Default for WellKnownAddresses {
    fn default() -> Self {
        Self {
            proxy: address!("FEEDC0DE00000000000000000000000000000000"),
            proxy_admin: address!("C0FFEE1234567890aBcDEF1234567890AbCdEf34"),
            validator_manager: address!("C0DEBA5E00000000000000000000000000000000"),
            validator_messages: address!("ca11ab1e00000000000000000000000000000000"),
        }
    }
}

/// EVM JSON-RPC settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Node base URL; the chain endpoint is `{base_url}/ext/bc/{chain_id}/rpc`.
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub receipt_timeout_secs: u64,
    pub receipt_poll_interval_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://127.0.0.1:9650"),
            request_timeout_secs: 10,
            receipt_timeout_secs: 60,
            receipt_poll_interval_ms: 500,
        }
    }
}

impl RpcConfig {
    /// JSON-RPC endpoint of an L1 chain.
    pub fn endpoint(&self, chain_id: &str) -> String {
        format!("{}/ext/bc/{}/rpc", self.base_url.trim_end_matches('/'), chain_id)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

/// Parameters of a validator registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub weight: u64,
    /// Seconds between expiry creation and expiry.
    pub expiry_duration_secs: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            weight: 20,
            expiry_duration_secs: 24 * 60 * 60,
        }
    }
}

impl RegistrationConfig {
    pub fn expiry_duration(&self) -> Duration {
        Duration::from_secs(self.expiry_duration_secs)
    }
}

/// Signature aggregation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Signature-aggregator service endpoint.
    pub url: String,
    /// Required stake percentage; 0 lets the service apply its default (67).
    pub quorum_percentage: u32,
    /// Peers the aggregator should contact.
    pub peers: Vec<String>,
    pub log_level: String,
    pub allow_private_ips: bool,
    pub timeout_secs: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            url: String::from("http://127.0.0.1:8080/aggregate-signatures"),
            quorum_percentage: 0,
            peers: vec![String::from("http://127.0.0.1:9650")],
            log_level: String::from("info"),
            allow_private_ips: true,
            timeout_secs: 120,
        }
    }
}

impl AggregatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = OnboardConfig::from_json(
            r#"{ "network_id": 1, "registration": { "weight": 50 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.network_id, 1);
        assert_eq!(cfg.registration.weight, 50);
        assert_eq!(cfg.registration.expiry_duration_secs, 86_400);
        assert_eq!(cfg.rpc, RpcConfig::default());
        assert_eq!(cfg.addressing, AddressingScheme::WellKnown);
    }

    #[test]
    fn test_rpc_endpoint() {
        let rpc = RpcConfig {
            base_url: String::from("http://node:9650/"),
            ..RpcConfig::default()
        };
        assert_eq!(rpc.endpoint("abc"), "http://node:9650/ext/bc/abc/rpc");
    }

    #[test]
    fn test_addressing_scheme_json() {
        let cfg = OnboardConfig::from_json(
            r#"{ "addressing": { "kind": "deployer_nonce", "nonce": 1 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.addressing, AddressingScheme::DeployerNonce { nonce: 1 });
    }
}
