//! Genesis generation from compiled-contract files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use serde_json::Value;
use tempfile::TempDir;

use poa_onboard::config::OnboardConfig;
use poa_onboard::genesis::{
    library_placeholder, AddressingScheme, GenesisAllocationBuilder, GenesisArtifacts,
    GenesisError,
};
use poa_onboard::identity::{load_or_generate_owner_key, OwnerKey};
use poa_onboard::storage::FileArtifactStore;

const TIMESTAMP: u64 = 1_717_000_000;

fn fixtures(dir: &Path) -> OnboardConfig {
    let mut config = OnboardConfig::default();
    config.data_dir = dir.join("data");
    config.genesis_output = dir.join("data").join("L1-genesis.json");

    let compiled = dir.join("compiled");
    let proxy = dir.join("proxy_compiled");
    fs::create_dir_all(&compiled).unwrap();
    fs::create_dir_all(&proxy).unwrap();

    let placeholder = library_placeholder(&config.contracts.library_name);
    config.contracts.validator_messages = compiled.join("ValidatorMessages.json");
    config.contracts.validator_manager = compiled.join("PoAValidatorManager.json");
    config.contracts.proxy_admin = proxy.join("deployed_proxy_admin_bytecode.txt");
    config.contracts.transparent_proxy = proxy.join("deployed_transparent_proxy_bytecode.txt");

    fs::write(
        &config.contracts.validator_messages,
        r#"{"abi":[],"deployedBytecode":{"object":"0x73000000000000000000000000000000000000000030"}}"#,
    )
    .unwrap();
    fs::write(
        &config.contracts.validator_manager,
        format!(r#"{{"abi":[],"deployedBytecode":{{"object":"0x608073{placeholder}5f"}}}}"#),
    )
    .unwrap();
    fs::write(&config.contracts.proxy_admin, "0x6080604052\n").unwrap();
    fs::write(&config.contracts.transparent_proxy, "608060405236\n").unwrap();
    config
}

fn owner() -> OwnerKey {
    OwnerKey::parse("0x4646464646464646464646464646464646464646464646464646464646464646").unwrap()
}

fn generate(config: &OnboardConfig, key: &OwnerKey) -> Result<PathBuf, GenesisError> {
    let artifacts = GenesisArtifacts::load(&config.contracts)?;
    let builder = GenesisAllocationBuilder::new(config);
    let (genesis, _) = builder.build(&key.public_key_uncompressed(), TIMESTAMP, &artifacts)?;
    builder.write(&genesis)
}

fn alloc_key(address: Address) -> String {
    hex::encode(address)
}

#[test]
fn test_genesis_file_contents() {
    let dir = TempDir::new().unwrap();
    let config = fixtures(dir.path());
    let path = generate(&config, &owner()).unwrap();
    assert_eq!(path, config.genesis_output);

    let genesis: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(genesis["config"]["chainId"], 12345);
    assert_eq!(genesis["config"]["warpConfig"]["blockTimestamp"], TIMESTAMP);
    assert_eq!(genesis["timestamp"], format!("{TIMESTAMP:#x}"));

    let alloc = genesis["alloc"].as_object().unwrap();
    assert_eq!(alloc.len(), 5);
    assert!(alloc.keys().all(|k| !k.starts_with("0x") && k.len() == 40));

    let deployer = &alloc[&alloc_key(owner().eth_address())];
    assert_eq!(deployer["balance"], "0x8ac7230489e80000");

    let addresses = config.addresses;
    let manager = &alloc[&alloc_key(addresses.validator_manager)];
    assert_eq!(
        manager["code"],
        format!("0x608073{}5f", hex::encode(addresses.validator_messages))
    );
    assert_eq!(manager["nonce"], "0x1");
    assert_eq!(alloc[&alloc_key(addresses.proxy_admin)]["code"], "0x6080604052");
    assert_eq!(alloc[&alloc_key(addresses.proxy)]["code"], "0x608060405236");
}

#[test]
fn test_same_inputs_same_bytes() {
    let dir = TempDir::new().unwrap();
    let config = fixtures(dir.path());

    let path = generate(&config, &owner()).unwrap();
    let first = fs::read(&path).unwrap();
    generate(&config, &owner()).unwrap();
    assert_eq!(fs::read(&path).unwrap(), first);
}

#[test]
fn test_addressing_changes_only_link_bytes() {
    let dir = TempDir::new().unwrap();
    let mut config = fixtures(dir.path());
    let artifacts = GenesisArtifacts::load(&config.contracts).unwrap();
    let key = owner().public_key_uncompressed();

    let (known, known_plan) = GenesisAllocationBuilder::new(&config)
        .build(&key, TIMESTAMP, &artifacts)
        .unwrap();
    config.addressing = AddressingScheme::DeployerNonce { nonce: 0 };
    let (derived, derived_plan) = GenesisAllocationBuilder::new(&config)
        .build(&key, TIMESTAMP, &artifacts)
        .unwrap();

    assert_eq!(derived_plan.validator_messages, owner().eth_address().create(0));
    assert_eq!(derived_plan.validator_manager, owner().eth_address().create(1));
    assert_eq!(derived_plan.proxy, known_plan.proxy);

    let a = &known.alloc[&known_plan.validator_manager].code;
    let b = &derived.alloc[&derived_plan.validator_manager].code;
    assert_eq!(a.len(), b.len());
    let differing: Vec<usize> = (0..a.len()).filter(|&i| a[i] != b[i]).collect();
    assert!(differing.iter().all(|i| (3..23).contains(i)), "{differing:?}");
    assert_eq!(&b[3..23], derived_plan.validator_messages.as_slice());

    // The deployer's next CREATE must not land on a pre-deployed contract.
    assert_eq!(known.alloc[&known_plan.deployer].nonce, 0);
    let deployer = &derived.alloc[&derived_plan.deployer];
    assert_eq!(deployer.nonce, 2);
    assert!(!derived
        .alloc
        .contains_key(&derived_plan.deployer.create(deployer.nonce)));
}

#[test]
fn test_missing_artifact_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = fixtures(dir.path());
    fs::remove_file(&config.contracts.transparent_proxy).unwrap();

    assert!(matches!(
        generate(&config, &owner()),
        Err(GenesisError::Storage(_))
    ));
    assert!(!config.genesis_output.exists());
}

#[test]
fn test_owner_key_generated_once() {
    let dir = TempDir::new().unwrap();
    let config = fixtures(dir.path());
    let store = FileArtifactStore::new(&config.data_dir, config.artifacts.clone());

    let (first, created) = load_or_generate_owner_key(&store).unwrap();
    assert!(created);
    let (second, created) = load_or_generate_owner_key(&store).unwrap();
    assert!(!created);
    assert_eq!(first.eth_address(), second.eth_address());

    let path = generate(&config, &first).unwrap();
    let genesis: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert!(genesis["alloc"].get(alloc_key(first.eth_address())).is_some());
}
