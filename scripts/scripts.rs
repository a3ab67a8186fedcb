//! Command line front end for the protocol deployment.
//!
//! Inputs come from positional arguments, falling back to environment
//! variables (a `.env` file is loaded first by the binary).

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use helpers::{
    parse_felt, setup_client, AcceptancePolicy, Action, ArtifactStore, ClassSource, ClientConfig,
    ClientSetup, Credentials, DeployOptions, Deployer, DeploymentReport, Manifest, Network, Plan,
    Preflight,
};
use log::info;
use url::Url;

/// Kakarot protocol: contract classes, proxy, account registry and its wiring.
pub const KAKAROT_MANIFEST: &str = include_str!("manifests/kakarot.toml");

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Declare, deploy and configure the Kakarot protocol",
    long_about = None
)]
pub struct Arguments {
    /// Admin private key, decimal or 0x-prefixed hex
    #[arg(env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Admin account address (hex)
    #[arg(env = "ACCOUNT_ADDRESS")]
    pub account_address: String,

    /// Target network: mainnet, sepolia, devnet or an RPC url
    #[arg(env = "NETWORK")]
    pub network: String,

    /// RPC endpoint overriding the network default
    #[arg(long, env = "STARKNET_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Chain id overriding the network default
    #[arg(long, env = "CHAIN_ID")]
    pub chain_id: Option<String>,

    /// Directory holding the compiled contracts
    #[arg(long, env = "BUILD_PATH", default_value = "build")]
    pub build_dir: PathBuf,

    /// Deployment manifest; the bundled Kakarot manifest when omitted
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Fee ceiling for every transaction, overriding the manifest
    #[arg(long, env = "MAX_FEE")]
    pub max_fee: Option<String>,

    /// Seconds to wait for each transaction to be accepted
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Seconds between two acceptance polls
    #[arg(long, default_value_t = 5)]
    pub poll_interval: u64,

    /// Where to write the deployment report; deployments/<network>.json by default
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// The admin account is a Cairo 0 account
    #[arg(long)]
    pub legacy_account: bool,

    /// Validate the manifest and artifacts without touching the network
    #[arg(long)]
    pub dry_run: bool,
}

impl Arguments {
    pub fn network(&self) -> anyhow::Result<Network> {
        Ok(self.network.parse()?)
    }

    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let chain_id = self
            .chain_id
            .as_deref()
            .map(parse_felt)
            .transpose()
            .map_err(|reason| anyhow::anyhow!("invalid chain id: {reason}"))?;
        Ok(ClientConfig {
            network: self.network()?,
            rpc_url: self.rpc_url.clone(),
            chain_id,
            legacy_account: self.legacy_account,
        })
    }

    pub fn deploy_options(&self) -> anyhow::Result<DeployOptions> {
        let max_fee = self
            .max_fee
            .as_deref()
            .map(parse_felt)
            .transpose()
            .map_err(|reason| anyhow::anyhow!("invalid max fee: {reason}"))?;
        Ok(DeployOptions {
            max_fee,
            acceptance: AcceptancePolicy {
                poll_interval: Duration::from_secs(self.poll_interval),
                timeout: Duration::from_secs(self.timeout),
            },
        })
    }

    pub fn plan(&self) -> anyhow::Result<Plan> {
        let manifest = match &self.manifest {
            Some(path) => Manifest::from_file(path)?,
            None => Manifest::from_toml(KAKAROT_MANIFEST)?,
        };
        Ok(manifest.validate()?)
    }

    pub fn report_path(&self, network: &Network) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            Path::new("deployments").join(format!("{}.json", network.slug()))
        })
    }
}

/// Runs the whole deployment described by `args`.
///
/// Returns `None` for a dry run, the accepted steps otherwise.
pub async fn run(args: &Arguments) -> anyhow::Result<Option<DeploymentReport>> {
    let network = args.network()?;
    let credentials = Credentials::parse(&args.private_key, &args.account_address)?;
    let plan = args.plan()?;
    let store = ArtifactStore::new(&args.build_dir);
    // Every file is read before the client may talk to the node
    let preflight = Preflight::load(&plan, &store)?;

    if args.dry_run {
        info!(
            "Manifest OK: {} steps, {} artifacts found in {}",
            plan.steps.len(),
            preflight.artifact_count(),
            store.build_dir().display()
        );
        for (index, step) in plan.steps.iter().enumerate() {
            info!("  {}. {}", index + 1, describe(&step.action, &step.name));
        }
        return Ok(None);
    }

    info!("----------------------------------");
    info!("--- Deploying Kakarot Protocol ---");
    info!("----------------------------------");

    let ClientSetup { gateway, identity } =
        setup_client(&credentials, &args.client_config()?).await?;
    info!(
        "Admin account {:#x} (public key {:#x}) on {network} via {}",
        identity.account_address, identity.public_key, identity.endpoint
    );

    let report = Deployer::new(&gateway, &store, args.deploy_options()?)
        .run_loaded(&plan, &preflight)
        .await?;

    for (name, contract) in report.contracts() {
        info!("{name}: {:#x}", contract.address);
    }
    let path = args.report_path(&network);
    report
        .write_json(&path)
        .with_context(|| format!("writing deployment report to {}", path.display()))?;
    info!("Deployment report written to {}", path.display());

    Ok(Some(report))
}

fn describe(action: &Action, name: &str) -> String {
    match action {
        Action::Declare { artifact } => format!("declare {name} from {artifact}"),
        Action::Deploy {
            class: ClassSource::Declared(class),
            ..
        } => format!("deploy {name} from class {class}"),
        Action::Deploy {
            class: ClassSource::Artifact(artifact),
            ..
        } => format!("declare and deploy {name} from {artifact}"),
        Action::Invoke {
            contract,
            entrypoint,
            ..
        } => format!("invoke {contract}.{entrypoint}"),
    }
}
