//! Seam between the orchestrator and the network it deploys to.

use async_trait::async_trait;
use starknet::core::types::Felt;

use crate::{artifact::ContractArtifact, error::GatewayError};

/// Outcome of a submitted declare transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclareResult {
    pub transaction_hash: Felt,
    pub class_hash: Felt,
}

/// Instantiation of a declared class through the Universal Deployer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub class_hash: Felt,
    pub calldata: Vec<Felt>,
    pub salt: Felt,
    pub unique: bool,
    pub max_fee: Felt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployResult {
    pub transaction_hash: Felt,
    /// Address the contract lands at once the transaction is accepted.
    pub address: Felt,
}

/// State-changing call on a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    pub contract: Felt,
    pub selector: Felt,
    pub calldata: Vec<Felt>,
    pub max_fee: Felt,
}

/// What the network currently reports for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionState {
    /// Not yet known, or received but not executed.
    Pending,
    /// Accepted on L2 or L1 with a successful execution.
    Accepted,
    /// Rejected by the sequencer or reverted on execution.
    Rejected(String),
}

/// Signing client bound to one network endpoint.
///
/// Submission methods return as soon as the network has taken the
/// transaction; callers poll [`Gateway::transaction_state`] for acceptance.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Address of the account signing every transaction.
    fn account_address(&self) -> Felt;

    async fn declare(
        &self,
        artifact: &ContractArtifact,
        max_fee: Felt,
    ) -> Result<DeclareResult, GatewayError>;

    async fn deploy(&self, request: DeployRequest) -> Result<DeployResult, GatewayError>;

    /// Returns the hash of the submitted invoke transaction.
    async fn invoke(&self, request: InvokeRequest) -> Result<Felt, GatewayError>;

    async fn transaction_state(&self, transaction_hash: Felt)
        -> Result<TransactionState, GatewayError>;
}
