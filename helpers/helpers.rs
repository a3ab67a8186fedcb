//! Common helpers for the deployment scripts and tests
//!
//! The pieces compose into one linear flow: [`Credentials`] and a [`Network`]
//! build a signing client ([`setup_client`]), a [`Manifest`] validates into a
//! [`Plan`], and a [`Deployer`] runs that plan against any [`Gateway`].

mod acceptance;
mod artifact;
mod client;
mod context;
mod credentials;
mod error;
mod gateway;
mod manifest;
mod network;
mod pipeline;
mod report;

pub use acceptance::{
    wait_for_acceptance, AcceptancePolicy, DEFAULT_ACCEPTANCE_TIMEOUT, DEFAULT_POLL_INTERVAL,
};
pub use artifact::{ArtifactKind, ArtifactStore, ContractAbi, ContractArtifact};
pub use client::{setup_client, ClientConfig, ClientIdentity, ClientSetup, StarknetGateway};
pub use context::{DeclaredClass, DeployedContract, RunContext};
pub use credentials::{parse_felt, parse_hex_felt, Credentials};
pub use error::{DeployError, GatewayError, Result};
pub use gateway::{
    DeclareResult, DeployRequest, DeployResult, Gateway, InvokeRequest, TransactionState,
};
pub use manifest::{
    encode_calldata, Action, Calldata, CalldataArg, ClassSource, Manifest, Plan, Step, StepSpec,
};
pub use network::Network;
pub use pipeline::{DeployOptions, Deployer, Preflight, DEFAULT_MAX_FEE};
pub use report::{DeploymentReport, StepRecord};

pub use starknet::core::types::Felt;
