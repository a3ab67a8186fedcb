use std::collections::HashMap;

use serde::Serialize;
use starknet::core::types::Felt;

use crate::error::{DeployError, Result};

/// Class registered on the network by a declare step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeclaredClass {
    #[serde(serialize_with = "crate::report::felt_hex")]
    pub class_hash: Felt,
    #[serde(serialize_with = "crate::report::felt_hex")]
    pub transaction_hash: Felt,
}

/// Contract instance created by a deploy step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeployedContract {
    #[serde(serialize_with = "crate::report::felt_hex")]
    pub address: Felt,
    #[serde(serialize_with = "crate::report::felt_hex")]
    pub class_hash: Felt,
    #[serde(serialize_with = "crate::report::felt_hex")]
    pub transaction_hash: Felt,
}

/// State carried from one step to the next.
///
/// References are only recorded once their transaction has been accepted.
#[derive(Debug, Clone)]
pub struct RunContext {
    account_address: Felt,
    classes: HashMap<String, Felt>,
    contracts: HashMap<String, DeployedContract>,
}

impl RunContext {
    pub fn new(account_address: Felt) -> Self {
        Self {
            account_address,
            classes: HashMap::new(),
            contracts: HashMap::new(),
        }
    }

    pub fn account_address(&self) -> Felt {
        self.account_address
    }

    pub fn record_class(&mut self, name: &str, class_hash: Felt) {
        self.classes.insert(name.to_string(), class_hash);
    }

    pub fn record_contract(&mut self, name: &str, contract: DeployedContract) {
        self.classes.insert(name.to_string(), contract.class_hash);
        self.contracts.insert(name.to_string(), contract);
    }

    pub fn class_hash(&self, name: &str) -> Result<Felt> {
        self.classes.get(name).copied().ok_or_else(|| {
            DeployError::config(format!("no accepted class hash recorded for `{name}`"))
        })
    }

    pub fn contract(&self, name: &str) -> Result<&DeployedContract> {
        self.contracts.get(name).ok_or_else(|| {
            DeployError::config(format!("no accepted deployment recorded for `{name}`"))
        })
    }

    pub fn address(&self, name: &str) -> Result<Felt> {
        self.contract(name).map(|contract| contract.address)
    }
}
