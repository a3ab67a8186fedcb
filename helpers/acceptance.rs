use std::time::Duration;

use log::debug;
use starknet::core::types::Felt;
use tokio::time::{sleep, timeout};

use crate::{
    error::{DeployError, Result},
    gateway::{Gateway, TransactionState},
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_ACCEPTANCE_TIMEOUT: Duration = Duration::from_secs(300);

/// How long to wait for a transaction to be accepted, and how often to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptancePolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_ACCEPTANCE_TIMEOUT,
        }
    }
}

/// Blocks until the network reports `transaction_hash` as accepted.
///
/// A rejection or revert is a [`DeployError::TransactionRejected`]; running
/// past the policy's deadline is a [`DeployError::Timeout`].
pub async fn wait_for_acceptance<G: Gateway + ?Sized>(
    gateway: &G,
    step: &str,
    transaction_hash: Felt,
    policy: &AcceptancePolicy,
) -> Result<()> {
    let poll = async {
        loop {
            let state = gateway
                .transaction_state(transaction_hash)
                .await
                .map_err(|e| e.into_deploy_error(step))?;
            match state {
                TransactionState::Accepted => return Ok(()),
                TransactionState::Rejected(reason) => {
                    return Err(DeployError::TransactionRejected {
                        step: step.to_string(),
                        reason,
                    })
                }
                TransactionState::Pending => {
                    debug!("{step}: transaction {transaction_hash:#x} pending");
                    sleep(policy.poll_interval).await;
                }
            }
        }
    };

    timeout(policy.timeout, poll)
        .await
        .map_err(|_| DeployError::Timeout {
            step: step.to_string(),
            tx_hash: transaction_hash,
            timeout: policy.timeout,
        })?
}
