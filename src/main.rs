//! `poa-onboard` command line.
//!
//! - `genesis`: writes the L1 genesis, generating the owner key on first use.
//! - `register`: registers the provisioned node as a validator.
//! - `owner-key`: shows the owner's addresses.
//!
//! Logging honours `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use poa_onboard::config::OnboardConfig;
use poa_onboard::evm::JsonRpcClient;
use poa_onboard::genesis::{GenesisAllocationBuilder, GenesisArtifacts};
use poa_onboard::identity::{load_or_generate_owner_key, ArtifactIdentityStore, IdentityStore};
use poa_onboard::registration::expiry::unix_now;
use poa_onboard::registration::{HttpSignatureAggregator, RegistrationOutcome, RegistrationPipeline};
use poa_onboard::storage::FileArtifactStore;

#[derive(Parser)]
#[command(version, about = "Proof-of-Authority validator onboarding")]
struct Cli {
    /// JSON config file; defaults apply to anything it omits.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the L1 genesis with the validator manager pre-deployed.
    Genesis {
        /// Genesis timestamp (unix seconds); defaults to now.
        #[arg(long)]
        timestamp: Option<u64>,
    },
    /// Register the provisioned node through the validator manager.
    Register,
    /// Print the owner's EVM and P-Chain addresses.
    OwnerKey,
}

fn load_config(path: Option<&PathBuf>) -> Result<OnboardConfig> {
    let Some(path) = path else {
        return Ok(OnboardConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    OnboardConfig::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn artifact_store(config: &OnboardConfig) -> FileArtifactStore {
    FileArtifactStore::new(&config.data_dir, config.artifacts.clone())
}

fn cmd_genesis(config: &OnboardConfig, timestamp: Option<u64>) -> Result<()> {
    let store = artifact_store(config);
    let (owner, created) = load_or_generate_owner_key(&store)?;
    if created {
        println!("Generated owner key {}", owner.eth_address());
    }

    let artifacts = GenesisArtifacts::load(&config.contracts)?;
    let builder = GenesisAllocationBuilder::new(config);
    let (genesis, plan) = builder.build(
        &owner.public_key_uncompressed(),
        timestamp.unwrap_or_else(unix_now),
        &artifacts,
    )?;
    let path = builder.write(&genesis)?;

    println!("Genesis written to {}", path.display());
    println!("  deployer            {}", plan.deployer);
    println!("  ValidatorMessages   {}", plan.validator_messages);
    println!("  PoAValidatorManager {}", plan.validator_manager);
    println!("  proxy               {}", plan.proxy);
    println!("  proxy admin         {}", plan.proxy_admin);
    Ok(())
}

fn cmd_register(config: &OnboardConfig) -> Result<()> {
    let store = artifact_store(config);
    let identities = ArtifactIdentityStore::new(&store);
    let chain_id = identities.chain_id()?;
    let endpoint = config.rpc.endpoint(&chain_id.to_string());
    let rpc = JsonRpcClient::new(endpoint, config.rpc.request_timeout())?;
    let aggregator = HttpSignatureAggregator::new(config.aggregator.url.clone())?;

    let pipeline = RegistrationPipeline::new(config, &store, &identities, &rpc, &aggregator);
    match pipeline.run()? {
        RegistrationOutcome::AlreadyComplete { validation_id } => {
            println!("Already registered; signed warp message is stored");
            if let Some(id) = validation_id {
                println!("  validation id {id}");
            }
        }
        RegistrationOutcome::Registered(report) => {
            println!("Registered {}", report.node_id);
            println!("  validation id {}", report.validation_id);
            println!("  expiry        {}", report.expiry);
            println!(
                "  signers       {}",
                report.signed.signature.signer_count()
            );
        }
    }
    Ok(())
}

fn cmd_owner_key(config: &OnboardConfig) -> Result<()> {
    let store = artifact_store(config);
    let owner = ArtifactIdentityStore::new(&store).owner_key()?;
    println!("EVM address     {}", owner.eth_address());
    println!("P-Chain address {}", owner.p_chain_address());
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;
    match cli.cmd {
        Commands::Genesis { timestamp } => cmd_genesis(&config, timestamp),
        Commands::Register => cmd_register(&config),
        Commands::OwnerKey => cmd_owner_key(&config),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
