//! Genesis document types.
//!
//! Field names and encodings follow the EVM genesis format: block-level
//! quantities are `0x` hex strings, chain-config values are JSON numbers,
//! alloc keys are lowercase hex addresses without prefix.

use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

fn quantity<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:#x}"))
}

fn big_quantity<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:#x}"))
}

fn alloc_keys<S: Serializer>(
    alloc: &BTreeMap<Address, GenesisAccount>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(alloc.len()))?;
    for (address, account) in alloc {
        map.serialize_entry(&hex::encode(address), account)?;
    }
    map.end()
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

fn no_code(code: &Bytes) -> bool {
    code.is_empty()
}

/// One pre-funded or pre-deployed account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenesisAccount {
    #[serde(serialize_with = "big_quantity")]
    pub balance: U256,
    #[serde(skip_serializing_if = "no_code")]
    pub code: Bytes,
    #[serde(skip_serializing_if = "is_zero", serialize_with = "quantity")]
    pub nonce: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub storage: BTreeMap<B256, B256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeConfig {
    pub gas_limit: u64,
    pub target_block_rate: u64,
    pub min_base_fee: u64,
    pub target_gas: u64,
    pub base_fee_change_denominator: u64,
    pub min_block_gas_cost: u64,
    pub max_block_gas_cost: u64,
    pub block_gas_cost_step: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            gas_limit: 12_000_000,
            target_block_rate: 2,
            min_base_fee: 25_000_000_000,
            target_gas: 60_000_000,
            base_fee_change_denominator: 36,
            min_block_gas_cost: 0,
            max_block_gas_cost: 1_000_000,
            block_gas_cost_step: 200_000,
        }
    }
}

/// Warp precompile activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarpConfig {
    pub block_timestamp: u64,
    pub quorum_numerator: u64,
    pub require_primary_network_signers: bool,
}

impl WarpConfig {
    pub const DEFAULT_QUORUM_NUMERATOR: u64 = 67;

    pub fn activated_at(block_timestamp: u64) -> Self {
        Self {
            block_timestamp,
            quorum_numerator: Self::DEFAULT_QUORUM_NUMERATOR,
            require_primary_network_signers: true,
        }
    }
}

/// Chain config with every fork active from block 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    pub homestead_block: u64,
    pub eip150_block: u64,
    pub eip155_block: u64,
    pub eip158_block: u64,
    pub byzantium_block: u64,
    pub constantinople_block: u64,
    pub petersburg_block: u64,
    pub istanbul_block: u64,
    pub muir_glacier_block: u64,
    pub berlin_block: u64,
    pub london_block: u64,
    pub fee_config: FeeConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warp_config: Option<WarpConfig>,
}

impl ChainConfig {
    pub fn all_forks_at_genesis(chain_id: u64) -> Self {
        Self {
            chain_id,
            homestead_block: 0,
            eip150_block: 0,
            eip155_block: 0,
            eip158_block: 0,
            byzantium_block: 0,
            constantinople_block: 0,
            petersburg_block: 0,
            istanbul_block: 0,
            muir_glacier_block: 0,
            berlin_block: 0,
            london_block: 0,
            fee_config: FeeConfig::default(),
            warp_config: None,
        }
    }
}

/// The genesis document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Genesis {
    #[serde(serialize_with = "alloc_keys")]
    pub alloc: BTreeMap<Address, GenesisAccount>,
    pub coinbase: Address,
    pub config: ChainConfig,
    #[serde(serialize_with = "quantity")]
    pub difficulty: u64,
    pub extra_data: Bytes,
    #[serde(serialize_with = "quantity")]
    pub gas_limit: u64,
    #[serde(serialize_with = "quantity")]
    pub gas_used: u64,
    pub mix_hash: B256,
    #[serde(serialize_with = "quantity")]
    pub nonce: u64,
    #[serde(serialize_with = "quantity")]
    pub number: u64,
    pub parent_hash: B256,
    #[serde(serialize_with = "quantity")]
    pub timestamp: u64,
}

impl Genesis {
    /// Empty genesis block for `config` at `timestamp`.
    pub fn new(config: ChainConfig, timestamp: u64) -> Self {
        Self {
            alloc: BTreeMap::new(),
            coinbase: Address::ZERO,
            gas_limit: config.fee_config.gas_limit,
            config,
            difficulty: 0,
            extra_data: Bytes::new(),
            gas_used: 0,
            mix_hash: B256::ZERO,
            nonce: 0,
            number: 0,
            parent_hash: B256::ZERO,
            timestamp,
        }
    }

    /// Pretty JSON with sorted keys and 2-space indent.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        let value = sort_keys(serde_json::to_value(self)?);
        serde_json::to_string_pretty(&value)
    }
}

/// Rebuilds every object with keys in ascending order, whatever map type
/// serde_json was compiled with.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
