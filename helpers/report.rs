//! Record of a finished deployment, written out as JSON.

use std::{fs, path::Path};

use serde::{Serialize, Serializer};
use starknet::core::types::Felt;

use crate::{
    context::{DeclaredClass, DeployedContract},
    error::Result,
};

/// Serializes a felt as `0x`-prefixed lowercase hex.
pub(crate) fn felt_hex<S: Serializer>(
    value: &Felt,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:#x}"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepRecord {
    Declare {
        name: String,
        #[serde(flatten)]
        class: DeclaredClass,
    },
    Deploy {
        name: String,
        #[serde(flatten)]
        contract: DeployedContract,
    },
    Invoke {
        name: String,
        contract: String,
        entrypoint: String,
        #[serde(serialize_with = "felt_hex")]
        transaction_hash: Felt,
    },
}

impl StepRecord {
    pub fn name(&self) -> &str {
        match self {
            StepRecord::Declare { name, .. }
            | StepRecord::Deploy { name, .. }
            | StepRecord::Invoke { name, .. } => name,
        }
    }
}

/// Accepted steps of one run, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    #[serde(serialize_with = "felt_hex")]
    pub account_address: Felt,
    pub steps: Vec<StepRecord>,
}

impl DeploymentReport {
    pub fn new(account_address: Felt) -> Self {
        Self {
            account_address,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    /// Deployed contracts in the order they were deployed.
    pub fn contracts(&self) -> impl Iterator<Item = (&str, &DeployedContract)> {
        self.steps.iter().filter_map(|step| match step {
            StepRecord::Deploy { name, contract } => Some((name.as_str(), contract)),
            _ => None,
        })
    }

    pub fn invocations(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|step| matches!(step, StepRecord::Invoke { .. }))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the report, creating parent directories as needed.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
