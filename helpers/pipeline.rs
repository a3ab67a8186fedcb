//! Runs a validated [`Plan`] against a [`Gateway`], one step at a time.

use std::collections::HashMap;

use log::info;
use starknet::core::types::Felt;

use crate::{
    acceptance::{wait_for_acceptance, AcceptancePolicy},
    artifact::{ArtifactStore, ContractAbi, ContractArtifact},
    context::{DeclaredClass, DeployedContract, RunContext},
    error::{DeployError, GatewayError, Result},
    gateway::{DeployRequest, Gateway, InvokeRequest},
    manifest::{encode_calldata, Action, ClassSource, Plan, Step},
    report::{DeploymentReport, StepRecord},
};

/// Fee ceiling used when neither the command line nor the manifest sets one (1e16 wei).
pub const DEFAULT_MAX_FEE: Felt = Felt::from_hex_unchecked("0x2386f26fc10000");

#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Takes precedence over the manifest's `max_fee`.
    pub max_fee: Option<Felt>,
    pub acceptance: AcceptancePolicy,
}

/// Artifacts and ABIs a plan needs, all loaded before the first transaction.
#[derive(Debug, Default)]
pub struct Preflight {
    artifacts: HashMap<String, ContractArtifact>,
    abis: HashMap<String, ContractAbi>,
}

impl Preflight {
    /// Loads every file the plan names and checks invoked entrypoints against ABIs.
    pub fn load(plan: &Plan, store: &ArtifactStore) -> Result<Self> {
        let mut preflight = Preflight::default();

        for (step, file) in plan.artifacts() {
            let artifact = store.load(file)?;
            preflight.artifacts.insert(step.to_string(), artifact);
        }
        for (step, file) in plan.abis() {
            let abi = store.load_abi(file)?;
            preflight.abis.insert(step.to_string(), abi);
        }

        for step in &plan.steps {
            if let Action::Invoke {
                contract,
                entrypoint,
                ..
            } = &step.action
            {
                if let Some(abi) = preflight.abis.get(contract) {
                    if !abi.has_function(entrypoint) {
                        return Err(DeployError::config(format!(
                            "step `{}`: `{entrypoint}` is not a function of {} ({})",
                            step.name,
                            contract,
                            abi.path.display()
                        )));
                    }
                }
            }
        }

        Ok(preflight)
    }

    pub fn artifact(&self, step: &str) -> Result<&ContractArtifact> {
        self.artifacts
            .get(step)
            .ok_or_else(|| DeployError::config(format!("no artifact loaded for `{step}`")))
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }
}

/// Deployment orchestrator: executes steps strictly in order and stops at the
/// first failure. Nothing is retried or rolled back.
pub struct Deployer<'a, G: Gateway + ?Sized> {
    gateway: &'a G,
    store: &'a ArtifactStore,
    options: DeployOptions,
}

impl<'a, G: Gateway + ?Sized> Deployer<'a, G> {
    pub fn new(gateway: &'a G, store: &'a ArtifactStore, options: DeployOptions) -> Self {
        Self {
            gateway,
            store,
            options,
        }
    }

    pub async fn run(&self, plan: &Plan) -> Result<DeploymentReport> {
        let preflight = Preflight::load(plan, self.store)?;
        self.run_loaded(plan, &preflight).await
    }

    /// Runs `plan` with artifacts already loaded by [`Preflight::load`].
    pub async fn run_loaded(&self, plan: &Plan, preflight: &Preflight) -> Result<DeploymentReport> {
        let max_fee = self
            .options
            .max_fee
            .or(plan.max_fee)
            .unwrap_or(DEFAULT_MAX_FEE);

        let account_address = self.gateway.account_address();
        let mut ctx = RunContext::new(account_address);
        let mut report = DeploymentReport::new(account_address);

        for step in &plan.steps {
            let record = self.execute(step, preflight, &mut ctx, max_fee).await?;
            report.push(record);
        }

        Ok(report)
    }

    async fn execute(
        &self,
        step: &Step,
        preflight: &Preflight,
        ctx: &mut RunContext,
        max_fee: Felt,
    ) -> Result<StepRecord> {
        let name = step.name.as_str();
        match &step.action {
            Action::Declare { .. } => {
                let class = self.declare(name, preflight.artifact(name)?, max_fee).await?;
                ctx.record_class(name, class.class_hash);
                Ok(StepRecord::Declare {
                    name: name.to_string(),
                    class,
                })
            }
            Action::Deploy {
                class,
                calldata,
                salt,
                unique,
                ..
            } => {
                let class_hash = match class {
                    ClassSource::Declared(declared) => ctx.class_hash(declared)?,
                    ClassSource::Artifact(_) => {
                        let artifact = preflight.artifact(name)?;
                        self.declare(name, artifact, max_fee).await?.class_hash
                    }
                };

                info!("⏳ Deploying {name}...");
                let request = DeployRequest {
                    class_hash,
                    calldata: encode_calldata(calldata, ctx)?,
                    salt: salt.unwrap_or_else(random_salt),
                    unique: *unique,
                    max_fee,
                };
                let submitted = self
                    .gateway
                    .deploy(request)
                    .await
                    .map_err(|e| e.into_deploy_error(name))?;
                self.accepted(name, submitted.transaction_hash).await?;

                let contract = DeployedContract {
                    address: submitted.address,
                    class_hash,
                    transaction_hash: submitted.transaction_hash,
                };
                info!("{name} address: {:#x}", contract.address);
                ctx.record_contract(name, contract);
                Ok(StepRecord::Deploy {
                    name: name.to_string(),
                    contract,
                })
            }
            Action::Invoke {
                contract,
                entrypoint,
                selector,
                calldata,
                max_fee: step_fee,
            } => {
                info!("⏳ Invoking {contract}.{entrypoint}...");
                let request = InvokeRequest {
                    contract: ctx.address(contract)?,
                    selector: *selector,
                    calldata: encode_calldata(calldata, ctx)?,
                    max_fee: step_fee.unwrap_or(max_fee),
                };
                let transaction_hash = self
                    .gateway
                    .invoke(request)
                    .await
                    .map_err(|e| e.into_deploy_error(name))?;
                self.accepted(name, transaction_hash).await?;

                info!("{contract}.{entrypoint} accepted: {transaction_hash:#x}");
                Ok(StepRecord::Invoke {
                    name: name.to_string(),
                    contract: contract.clone(),
                    entrypoint: entrypoint.clone(),
                    transaction_hash,
                })
            }
        }
    }

    async fn declare(
        &self,
        name: &str,
        artifact: &ContractArtifact,
        max_fee: Felt,
    ) -> Result<DeclaredClass> {
        info!("⏳ Declaring {name}...");
        let submitted = self
            .gateway
            .declare(artifact, max_fee)
            .await
            .map_err(|e| match e {
                GatewayError::InvalidClass(reason) => DeployError::MalformedArtifact {
                    path: artifact.path.clone(),
                    reason,
                },
                other => other.into_deploy_error(name),
            })?;
        self.accepted(name, submitted.transaction_hash).await?;

        info!("{name} class hash: {:#x}", submitted.class_hash);
        Ok(DeclaredClass {
            class_hash: submitted.class_hash,
            transaction_hash: submitted.transaction_hash,
        })
    }

    async fn accepted(&self, name: &str, transaction_hash: Felt) -> Result<()> {
        wait_for_acceptance(self.gateway, name, transaction_hash, &self.options.acceptance).await
    }
}

fn random_salt() -> Felt {
    Felt::from(rand::random::<u128>())
}
