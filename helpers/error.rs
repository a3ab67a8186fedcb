use std::{path::PathBuf, time::Duration};

use starknet::core::types::Felt;
use thiserror::Error;

/// Errors raised while preparing or running a deployment.
///
/// Every variant is fatal to the run: the pipeline stops at the first error and
/// leaves already accepted on-chain state untouched.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Bad process input or an invalid manifest.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("Malformed artifact {}: {reason}", .path.display())]
    MalformedArtifact { path: PathBuf, reason: String },

    /// Key derivation or account construction failed.
    #[error("Client initialization failed: {0}")]
    ClientInit(String),

    #[error("Transaction for `{step}` rejected: {reason}")]
    TransactionRejected { step: String, reason: String },

    #[error("Transaction {tx_hash:#x} for `{step}` not accepted within {timeout:?}")]
    Timeout {
        step: String,
        tx_hash: Felt,
        timeout: Duration,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON Conversion Error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    pub fn config(message: impl Into<String>) -> Self {
        DeployError::Configuration(message.into())
    }
}

/// Errors reported by a [`crate::Gateway`] implementation.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The network refused the transaction, either at submission or on execution.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The endpoint could not be reached or answered with garbage.
    #[error("network: {0}")]
    Network(String),

    /// The SDK could not decode the class handed to `declare`.
    #[error("invalid class: {0}")]
    InvalidClass(String),
}

impl GatewayError {
    /// Attaches the name of the step that issued the failing call.
    pub fn into_deploy_error(self, step: &str) -> DeployError {
        match self {
            GatewayError::Rejected(reason) => DeployError::TransactionRejected {
                step: step.to_string(),
                reason,
            },
            GatewayError::Network(message) => DeployError::Network(message),
            GatewayError::InvalidClass(reason) => {
                DeployError::config(format!("class of `{step}` cannot be declared: {reason}"))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
