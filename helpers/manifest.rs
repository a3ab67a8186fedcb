//! Declared list of deployment steps and its static validation.
//!
//! A manifest is written in TOML as a list of `[[step]]` tables. Before
//! anything touches the network it is validated into a [`Plan`]: every name a
//! step refers to must be produced by a strictly earlier step, so a plan that
//! validates can always be resolved in order.

use std::{collections::HashSet, fs, path::Path};

use serde::Deserialize;
use starknet::core::{types::Felt, utils::get_selector_from_name};

use crate::{
    context::RunContext,
    credentials::parse_felt,
    error::{DeployError, Result},
};

/// Manifest as written on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Fee ceiling applied to every transaction unless a step overrides it.
    #[serde(default)]
    pub max_fee: Option<String>,
    #[serde(rename = "step", default)]
    pub steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepSpec {
    Declare {
        name: String,
        artifact: String,
    },
    Deploy {
        name: String,
        /// Name of an earlier `declare` step.
        class: String,
        #[serde(default)]
        calldata: Vec<CalldataArg>,
        salt: Option<String>,
        unique: Option<bool>,
        abi: Option<String>,
    },
    DeclareAndDeploy {
        name: String,
        artifact: String,
        #[serde(default)]
        calldata: Vec<CalldataArg>,
        salt: Option<String>,
        unique: Option<bool>,
        abi: Option<String>,
    },
    Invoke {
        name: Option<String>,
        contract: String,
        entrypoint: String,
        #[serde(default)]
        calldata: Vec<CalldataArg>,
        max_fee: Option<String>,
    },
}

/// One constructor or call argument as written in the manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalldataArg {
    /// The administrator account address.
    AccountAddress,
    /// Literal felt, decimal or `0x` hex.
    Felt(String),
    ClassHash(String),
    Address(String),
    /// Selector of an entrypoint name.
    Selector(String),
    /// Length-prefixed list of arguments.
    Array(Vec<CalldataArg>),
}

/// Validated, ready to run list of steps.
#[derive(Debug, Clone)]
pub struct Plan {
    pub max_fee: Option<Felt>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub action: Action,
}

#[derive(Debug, Clone)]
pub enum Action {
    Declare {
        artifact: String,
    },
    Deploy {
        class: ClassSource,
        calldata: Vec<Calldata>,
        salt: Option<Felt>,
        unique: bool,
        abi: Option<String>,
    },
    Invoke {
        contract: String,
        entrypoint: String,
        selector: Felt,
        calldata: Vec<Calldata>,
        max_fee: Option<Felt>,
    },
}

/// Where a deploy step gets its class from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassSource {
    /// Class hash recorded by an earlier step.
    Declared(String),
    /// Artifact declared by the deploy step itself.
    Artifact(String),
}

/// Calldata argument with literals parsed and references checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Calldata {
    Felt(Felt),
    AccountAddress,
    ClassHash(String),
    Address(String),
    Array(Vec<Calldata>),
}

impl Manifest {
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source)
            .map_err(|e| DeployError::config(format!("invalid manifest: {}", e.message())))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| {
            DeployError::config(format!("cannot read manifest {}: {e}", path.display()))
        })?;
        Self::from_toml(&source)
    }

    /// Checks the step list and turns it into a [`Plan`].
    pub fn validate(&self) -> Result<Plan> {
        if self.steps.is_empty() {
            return Err(DeployError::config("manifest has no steps"));
        }

        let max_fee = self
            .max_fee
            .as_deref()
            .map(|fee| parse_literal("max_fee", fee))
            .transpose()?;

        let mut scope = Scope::default();
        let mut steps = Vec::with_capacity(self.steps.len());

        for spec in &self.steps {
            let step = match spec {
                StepSpec::Declare { name, artifact } => {
                    scope.claim(name)?;
                    scope.classes.insert(name.clone());
                    Step {
                        name: name.clone(),
                        action: Action::Declare {
                            artifact: non_empty(name, "artifact", artifact)?,
                        },
                    }
                }
                StepSpec::Deploy {
                    name,
                    class,
                    calldata,
                    salt,
                    unique,
                    abi,
                } => {
                    if !scope.classes.contains(class) {
                        return Err(DeployError::config(format!(
                            "step `{name}` deploys class `{class}` which no earlier step declares"
                        )));
                    }
                    let calldata = scope.resolve_all(name, calldata)?;
                    scope.claim(name)?;
                    scope.classes.insert(name.clone());
                    scope.contracts.insert(name.clone());
                    Step {
                        name: name.clone(),
                        action: Action::Deploy {
                            class: ClassSource::Declared(class.clone()),
                            calldata,
                            salt: parse_optional(name, "salt", salt.as_deref())?,
                            unique: unique.unwrap_or(true),
                            abi: abi.clone(),
                        },
                    }
                }
                StepSpec::DeclareAndDeploy {
                    name,
                    artifact,
                    calldata,
                    salt,
                    unique,
                    abi,
                } => {
                    let calldata = scope.resolve_all(name, calldata)?;
                    scope.claim(name)?;
                    scope.classes.insert(name.clone());
                    scope.contracts.insert(name.clone());
                    Step {
                        name: name.clone(),
                        action: Action::Deploy {
                            class: ClassSource::Artifact(non_empty(name, "artifact", artifact)?),
                            calldata,
                            salt: parse_optional(name, "salt", salt.as_deref())?,
                            unique: unique.unwrap_or(true),
                            abi: abi.clone(),
                        },
                    }
                }
                StepSpec::Invoke {
                    name,
                    contract,
                    entrypoint,
                    calldata,
                    max_fee,
                } => {
                    let name = name
                        .clone()
                        .unwrap_or_else(|| format!("{contract}::{entrypoint}"));
                    if !scope.contracts.contains(contract) {
                        return Err(DeployError::config(format!(
                            "step `{name}` invokes `{contract}` which no earlier step deploys"
                        )));
                    }
                    let selector = selector_of(&name, entrypoint)?;
                    scope.claim(&name)?;
                    Step {
                        action: Action::Invoke {
                            contract: contract.clone(),
                            entrypoint: entrypoint.clone(),
                            selector,
                            calldata: scope.resolve_all(&name, calldata)?,
                            max_fee: parse_optional(&name, "max_fee", max_fee.as_deref())?,
                        },
                        name,
                    }
                }
            };
            steps.push(step);
        }

        Ok(Plan { max_fee, steps })
    }
}

impl Plan {
    /// Artifact files the plan declares, keyed by step name.
    pub fn artifacts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.steps.iter().filter_map(|step| match &step.action {
            Action::Declare { artifact }
            | Action::Deploy {
                class: ClassSource::Artifact(artifact),
                ..
            } => Some((step.name.as_str(), artifact.as_str())),
            _ => None,
        })
    }

    /// ABI files attached to deployed contracts, keyed by step name.
    pub fn abis(&self) -> impl Iterator<Item = (&str, &str)> {
        self.steps.iter().filter_map(|step| match &step.action {
            Action::Deploy { abi: Some(abi), .. } => Some((step.name.as_str(), abi.as_str())),
            _ => None,
        })
    }
}

impl Calldata {
    /// Appends the serialized form of this argument to `out`.
    pub fn encode(&self, ctx: &RunContext, out: &mut Vec<Felt>) -> Result<()> {
        match self {
            Calldata::Felt(value) => out.push(*value),
            Calldata::AccountAddress => out.push(ctx.account_address()),
            Calldata::ClassHash(name) => out.push(ctx.class_hash(name)?),
            Calldata::Address(name) => out.push(ctx.address(name)?),
            Calldata::Array(items) => {
                out.push(Felt::from(items.len() as u64));
                for item in items {
                    item.encode(ctx, out)?;
                }
            }
        }
        Ok(())
    }
}

/// Serializes a full argument list.
pub fn encode_calldata(args: &[Calldata], ctx: &RunContext) -> Result<Vec<Felt>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        arg.encode(ctx, &mut out)?;
    }
    Ok(out)
}

/// Names produced by the steps validated so far.
#[derive(Default)]
struct Scope {
    names: HashSet<String>,
    classes: HashSet<String>,
    contracts: HashSet<String>,
}

impl Scope {
    fn claim(&mut self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(DeployError::config("step names must not be empty"));
        }
        if !self.names.insert(name.to_string()) {
            return Err(DeployError::config(format!("duplicate step name `{name}`")));
        }
        Ok(())
    }

    fn resolve_all(&self, step: &str, args: &[CalldataArg]) -> Result<Vec<Calldata>> {
        args.iter().map(|arg| self.resolve(step, arg)).collect()
    }

    fn resolve(&self, step: &str, arg: &CalldataArg) -> Result<Calldata> {
        Ok(match arg {
            CalldataArg::AccountAddress => Calldata::AccountAddress,
            CalldataArg::Felt(value) => Calldata::Felt(parse_literal(step, value)?),
            CalldataArg::Selector(entrypoint) => Calldata::Felt(selector_of(step, entrypoint)?),
            CalldataArg::ClassHash(name) => {
                if !self.classes.contains(name) {
                    return Err(unknown_reference(step, "class hash", name));
                }
                Calldata::ClassHash(name.clone())
            }
            CalldataArg::Address(name) => {
                if !self.contracts.contains(name) {
                    return Err(unknown_reference(step, "address", name));
                }
                Calldata::Address(name.clone())
            }
            CalldataArg::Array(items) => Calldata::Array(self.resolve_all(step, items)?),
        })
    }
}

fn unknown_reference(step: &str, kind: &str, name: &str) -> DeployError {
    DeployError::config(format!(
        "step `{step}` uses the {kind} of `{name}` which no earlier step produces"
    ))
}

fn selector_of(step: &str, entrypoint: &str) -> Result<Felt> {
    if entrypoint.is_empty() {
        return Err(DeployError::config(format!(
            "step `{step}` names an empty entrypoint"
        )));
    }
    get_selector_from_name(entrypoint).map_err(|_| {
        DeployError::config(format!(
            "step `{step}`: entrypoint `{entrypoint}` is not ASCII"
        ))
    })
}

fn parse_literal(step: &str, value: &str) -> Result<Felt> {
    parse_felt(value).map_err(|reason| DeployError::config(format!("step `{step}`: {reason}")))
}

fn parse_optional(step: &str, field: &str, value: Option<&str>) -> Result<Option<Felt>> {
    value
        .map(|value| {
            parse_felt(value)
                .map_err(|reason| DeployError::config(format!("step `{step}` {field}: {reason}")))
        })
        .transpose()
}

fn non_empty(step: &str, field: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(DeployError::config(format!(
            "step `{step}` has an empty {field}"
        )));
    }
    Ok(value.to_string())
}
