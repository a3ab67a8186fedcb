//! Signing client backed by a Starknet JSON-RPC node.

use std::{fmt::Display, sync::Arc};

use async_trait::async_trait;
use log::debug;
use starknet::{
    accounts::{Account, AccountError, ConnectedAccount, ExecutionEncoding, SingleOwnerAccount},
    contract::ContractFactory,
    core::types::{
        contract::{legacy::LegacyContractClass, CompiledClass, SierraClass},
        BlockId, BlockTag, Call, ExecutionResult, Felt, StarknetError, TransactionExecutionStatus,
        TransactionStatus,
    },
    providers::{
        jsonrpc::{HttpTransport, JsonRpcClient},
        Provider, ProviderError,
    },
    signers::LocalWallet,
};
use url::Url;

use crate::{
    artifact::{ArtifactKind, ContractArtifact},
    credentials::Credentials,
    error::{DeployError, GatewayError, Result},
    gateway::{
        DeclareResult, DeployRequest, DeployResult, Gateway, InvokeRequest, TransactionState,
    },
    network::Network,
};

pub type RpcProvider = Arc<JsonRpcClient<HttpTransport>>;
pub type SigningAccount = SingleOwnerAccount<RpcProvider, LocalWallet>;

/// Where and how the client connects.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub network: Network,
    /// Overrides the network's default endpoint.
    pub rpc_url: Option<Url>,
    /// Overrides the network's chain id; queried from the node when neither is set.
    pub chain_id: Option<Felt>,
    /// Cairo 0 accounts expect the legacy `__execute__` calldata layout.
    pub legacy_account: bool,
}

impl ClientConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            rpc_url: None,
            chain_id: None,
            legacy_account: false,
        }
    }

    pub fn endpoint(&self) -> Url {
        self.rpc_url
            .clone()
            .unwrap_or_else(|| self.network.rpc_url())
    }
}

/// Everything that identifies a signing client. Same inputs, same identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub account_address: Felt,
    pub public_key: Felt,
    pub chain_id: Felt,
    pub endpoint: Url,
}

/// Client setup configuration
pub struct ClientSetup {
    pub gateway: StarknetGateway,
    pub identity: ClientIdentity,
}

/// Builds the admin signing client for the configured network.
pub async fn setup_client(
    credentials: &Credentials,
    config: &ClientConfig,
) -> Result<ClientSetup> {
    let endpoint = config.endpoint();
    let provider: RpcProvider =
        Arc::new(JsonRpcClient::new(HttpTransport::new(endpoint.clone())));

    let chain_id = match config.chain_id.or_else(|| config.network.chain_id()) {
        Some(chain_id) => chain_id,
        None => provider.chain_id().await.map_err(|e| {
            DeployError::ClientInit(format!("cannot read chain id from {endpoint}: {e}"))
        })?,
    };

    let encoding = if config.legacy_account {
        ExecutionEncoding::Legacy
    } else {
        ExecutionEncoding::New
    };
    let mut account = SingleOwnerAccount::new(
        provider,
        credentials.wallet(),
        credentials.account_address(),
        chain_id,
        encoding,
    );
    // Nonces must account for transactions accepted but not yet in a block
    account.set_block_id(BlockId::Tag(BlockTag::Pending));

    let identity = ClientIdentity {
        account_address: credentials.account_address(),
        public_key: credentials.public_key(),
        chain_id,
        endpoint,
    };
    debug!("signing client ready: {identity:?}");

    Ok(ClientSetup {
        gateway: StarknetGateway { account },
        identity,
    })
}

/// [`Gateway`] over a single-owner account on a JSON-RPC node.
pub struct StarknetGateway {
    account: SigningAccount,
}

impl StarknetGateway {
    async fn revert_reason(&self, transaction_hash: Felt) -> String {
        match self
            .account
            .provider()
            .get_transaction_receipt(transaction_hash)
            .await
        {
            Ok(receipt) => match receipt.receipt.execution_result() {
                ExecutionResult::Reverted { reason } => reason.clone(),
                ExecutionResult::Succeeded => "reverted".to_string(),
            },
            Err(e) => format!("reverted (receipt unavailable: {e})"),
        }
    }
}

#[async_trait]
impl Gateway for StarknetGateway {
    fn account_address(&self) -> Felt {
        self.account.address()
    }

    async fn declare(
        &self,
        artifact: &ContractArtifact,
        max_fee: Felt,
    ) -> std::result::Result<DeclareResult, GatewayError> {
        match &artifact.kind {
            ArtifactKind::Legacy => {
                let class: LegacyContractClass =
                    serde_json::from_str(&artifact.source).map_err(invalid_class)?;
                let result = self
                    .account
                    .declare_legacy(Arc::new(class))
                    .max_fee(max_fee)
                    .send()
                    .await
                    .map_err(submission_error)?;
                Ok(DeclareResult {
                    transaction_hash: result.transaction_hash,
                    class_hash: result.class_hash,
                })
            }
            ArtifactKind::Sierra { compiled_class } => {
                let class: SierraClass =
                    serde_json::from_str(&artifact.source).map_err(invalid_class)?;
                let compiled: CompiledClass =
                    serde_json::from_str(compiled_class).map_err(invalid_class)?;
                let compiled_class_hash = compiled.class_hash().map_err(invalid_class)?;
                let flattened = class.flatten().map_err(invalid_class)?;

                let result = self
                    .account
                    .declare_v2(Arc::new(flattened), compiled_class_hash)
                    .max_fee(max_fee)
                    .send()
                    .await
                    .map_err(submission_error)?;
                Ok(DeclareResult {
                    transaction_hash: result.transaction_hash,
                    class_hash: result.class_hash,
                })
            }
        }
    }

    async fn deploy(
        &self,
        request: DeployRequest,
    ) -> std::result::Result<DeployResult, GatewayError> {
        let factory = ContractFactory::new(request.class_hash, self.account.clone());
        let deployment = factory
            .deploy_v1(request.calldata, request.salt, request.unique)
            .max_fee(request.max_fee);
        let address = deployment.deployed_address();

        let result = deployment.send().await.map_err(submission_error)?;
        Ok(DeployResult {
            transaction_hash: result.transaction_hash,
            address,
        })
    }

    async fn invoke(&self, request: InvokeRequest) -> std::result::Result<Felt, GatewayError> {
        let call = Call {
            to: request.contract,
            selector: request.selector,
            calldata: request.calldata,
        };
        let result = self
            .account
            .execute_v1(vec![call])
            .max_fee(request.max_fee)
            .send()
            .await
            .map_err(submission_error)?;
        Ok(result.transaction_hash)
    }

    async fn transaction_state(
        &self,
        transaction_hash: Felt,
    ) -> std::result::Result<TransactionState, GatewayError> {
        let status = match self
            .account
            .provider()
            .get_transaction_status(transaction_hash)
            .await
        {
            Ok(status) => status,
            Err(ProviderError::StarknetError(StarknetError::TransactionHashNotFound)) => {
                return Ok(TransactionState::Pending)
            }
            Err(e) => return Err(GatewayError::Network(e.to_string())),
        };

        Ok(match status {
            TransactionStatus::Received => TransactionState::Pending,
            TransactionStatus::Rejected => {
                TransactionState::Rejected("rejected by the sequencer".to_string())
            }
            TransactionStatus::AcceptedOnL2(execution)
            | TransactionStatus::AcceptedOnL1(execution) => match execution {
                TransactionExecutionStatus::Succeeded => TransactionState::Accepted,
                TransactionExecutionStatus::Reverted => {
                    TransactionState::Rejected(self.revert_reason(transaction_hash).await)
                }
            },
        })
    }
}

fn invalid_class(error: impl Display) -> GatewayError {
    GatewayError::InvalidClass(error.to_string())
}

/// Node-side refusals are rejections; transport trouble is a network error.
fn submission_error<S: Display>(error: AccountError<S>) -> GatewayError {
    match error {
        AccountError::Provider(ProviderError::StarknetError(e)) => {
            GatewayError::Rejected(e.to_string())
        }
        AccountError::Provider(e) => GatewayError::Network(e.to_string()),
        other => GatewayError::Rejected(other.to_string()),
    }
}
