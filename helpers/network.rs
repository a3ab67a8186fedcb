//! Target networks and their RPC endpoints.

use std::{fmt, str::FromStr};

use starknet::core::{chain_id, types::Felt};
use url::Url;

use crate::error::DeployError;

const MAINNET_RPC: &str = "https://starknet-mainnet.public.blastapi.io/rpc/v0_7";
const SEPOLIA_RPC: &str = "https://starknet-sepolia.public.blastapi.io/rpc/v0_7";
const DEVNET_RPC: &str = "http://127.0.0.1:5050";

/// Network a deployment targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Sepolia,
    /// Local development node (katana or starknet-devnet).
    Devnet,
    /// Any other node, addressed directly by its RPC URL.
    Custom(Url),
}

impl Network {
    /// Default JSON-RPC endpoint for this network.
    pub fn rpc_url(&self) -> Url {
        let builtin = match self {
            Network::Mainnet => MAINNET_RPC,
            Network::Sepolia => SEPOLIA_RPC,
            Network::Devnet => DEVNET_RPC,
            Network::Custom(url) => return url.clone(),
        };
        Url::parse(builtin).expect("built-in RPC urls are valid")
    }

    /// Chain id when it is fixed by the network, `None` when it has to be
    /// queried from the node.
    pub fn chain_id(&self) -> Option<Felt> {
        match self {
            Network::Mainnet => Some(chain_id::MAINNET),
            Network::Sepolia => Some(chain_id::SEPOLIA),
            Network::Devnet | Network::Custom(_) => None,
        }
    }

    /// Short name used for report files.
    pub fn slug(&self) -> String {
        match self {
            Network::Mainnet => "mainnet".to_string(),
            Network::Sepolia => "sepolia".to_string(),
            Network::Devnet => "devnet".to_string(),
            Network::Custom(url) => url
                .host_str()
                .map(|host| match url.port() {
                    Some(port) => format!("{host}-{port}"),
                    None => host.to_string(),
                })
                .unwrap_or_else(|| "custom".to_string()),
        }
    }
}

impl FromStr for Network {
    type Err = DeployError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "sepolia" | "testnet" => Ok(Network::Sepolia),
            "devnet" | "katana" | "localhost" => Ok(Network::Devnet),
            _ if value.starts_with("http://") || value.starts_with("https://") => Url::parse(value)
                .map(Network::Custom)
                .map_err(|e| DeployError::config(format!("invalid network url `{value}`: {e}"))),
            _ => Err(DeployError::config(format!(
                "unrecognized network `{value}` (expected mainnet, sepolia, devnet or an http(s) url)"
            ))),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Custom(url) => write!(f, "{url}"),
            other => f.write_str(&other.slug()),
        }
    }
}
