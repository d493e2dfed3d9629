use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use shared::types::network::{NativeCurrency, NetworkDescriptor};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub provider: ProviderConfig,
    pub network: NetworkConfig,
    pub contract: ContractConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub log_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// JSON-RPC endpoint of the wallet provider. Absent means no wallet is
    /// installed and the session stays disconnected.
    pub url: Option<String>,
    pub request_timeout_secs: u64,
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub currency_name: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
    pub rpc_url: String,
    pub explorer_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    pub community_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub poll_interval_secs: u64,
    pub reconcile_debounce_ms: u64,
    pub hint_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            service: ServiceConfig {
                name: std::env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "wallet-service".to_string()),
                log_format: std::env::var("SERVICE_LOG_FORMAT")
                    .unwrap_or_else(|_| "json".to_string()),
            },
            provider: ProviderConfig {
                url: std::env::var("WALLET_PROVIDER_URL").ok(),
                request_timeout_secs: std::env::var("PROVIDER_REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                refresh_interval_secs: std::env::var("PROVIDER_REFRESH_INTERVAL_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
            },
            network: NetworkConfig {
                chain_id: std::env::var("CHAIN_ID")
                    .unwrap_or_else(|_| "31".to_string())
                    .parse()?,
                chain_name: std::env::var("CHAIN_NAME")
                    .unwrap_or_else(|_| "Rootstock Testnet".to_string()),
                currency_name: std::env::var("CURRENCY_NAME")
                    .unwrap_or_else(|_| "tRBTC".to_string()),
                currency_symbol: std::env::var("CURRENCY_SYMBOL")
                    .unwrap_or_else(|_| "tRBTC".to_string()),
                currency_decimals: std::env::var("CURRENCY_DECIMALS")
                    .unwrap_or_else(|_| "18".to_string())
                    .parse()?,
                rpc_url: std::env::var("RPC_URL")
                    .unwrap_or_else(|_| "https://public-node.testnet.rsk.co".to_string()),
                explorer_url: std::env::var("EXPLORER_URL")
                    .unwrap_or_else(|_| "https://explorer.testnet.rootstock.io/".to_string()),
            },
            contract: ContractConfig {
                community_address: std::env::var("COMMUNITY_ADDRESS")
                    .unwrap_or_else(|_| "0x2C8e10de89319BEdD4535fe668B659e6e1dF5593".to_string()),
            },
            session: SessionConfig {
                poll_interval_secs: std::env::var("NETWORK_POLL_INTERVAL_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                reconcile_debounce_ms: std::env::var("RECONCILE_DEBOUNCE_MS")
                    .unwrap_or_else(|_| "250".to_string())
                    .parse()?,
                hint_path: std::env::var("WALLET_HINT_PATH")
                    .unwrap_or_else(|_| "./wallet-hint.json".to_string())
                    .into(),
            },
        })
    }
}

impl NetworkConfig {
    /// Build the immutable descriptor handed to the session, the monitor,
    /// and `wallet_addEthereumChain`.
    pub fn descriptor(&self) -> NetworkDescriptor {
        NetworkDescriptor {
            chain_id: self.chain_id,
            chain_name: self.chain_name.clone(),
            native_currency: NativeCurrency {
                name: self.currency_name.clone(),
                symbol: self.currency_symbol.clone(),
                decimals: self.currency_decimals,
            },
            rpc_urls: vec![self.rpc_url.clone()],
            block_explorer_urls: vec![self.explorer_url.clone()],
        }
    }
}

impl ContractConfig {
    /// The deployed bounty board contract, validated as a checksummed address.
    pub fn community_address(&self) -> Result<Address> {
        Address::from_str(&self.community_address)
            .with_context(|| format!("Invalid community address {}", self.community_address))
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn reconcile_debounce(&self) -> Duration {
        Duration::from_millis(self.reconcile_debounce_ms)
    }
}
