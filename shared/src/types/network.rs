//! Target network descriptors and chain-id plumbing

use serde::{Deserialize, Serialize};

use super::error::WalletError;

/// Chain id of the network the bounty board contract is deployed on.
pub const ROOTSTOCK_TESTNET_CHAIN_ID: u64 = 31;

/// Parse a chain id as wallets report it: hex with a `0x` prefix or
/// a plain decimal string.
pub fn parse_chain_id(raw: &str) -> Result<u64, WalletError> {
    let trimmed = raw.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| WalletError::InvalidChainId(raw.to_string()))
}

/// Render a chain id in the `0x`-prefixed hex form wallet RPC methods expect.
pub fn format_chain_id(chain_id: u64) -> String {
    format!("0x{:x}", chain_id)
}

/// Display name for well-known chains, used when telling the user which
/// network they are actually connected to.
pub fn known_chain_name(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("Ethereum Mainnet"),
        11155111 => Some("Sepolia"),
        30 => Some("Rootstock Mainnet"),
        31 => Some("Rootstock Testnet"),
        137 => Some("Polygon"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Immutable description of a target chain. The serialized form is exactly
/// the parameter object `wallet_addEthereumChain` expects, so a descriptor
/// can be handed to the wallet verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDescriptor {
    #[serde(with = "hex_chain_id")]
    pub chain_id: u64,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl NetworkDescriptor {
    /// The network the bounty board is deployed on.
    pub fn rootstock_testnet() -> Self {
        Self {
            chain_id: ROOTSTOCK_TESTNET_CHAIN_ID,
            chain_name: "Rootstock Testnet".to_string(),
            native_currency: NativeCurrency {
                name: "tRBTC".to_string(),
                symbol: "tRBTC".to_string(),
                decimals: 18,
            },
            rpc_urls: vec!["https://public-node.testnet.rsk.co".to_string()],
            block_explorer_urls: vec!["https://explorer.testnet.rootstock.io/".to_string()],
        }
    }

    /// Chain id in the hex form used on the wire.
    pub fn chain_id_hex(&self) -> String {
        format_chain_id(self.chain_id)
    }

    /// Whether the given chain id is the one this descriptor targets.
    pub fn matches(&self, chain_id: u64) -> bool {
        self.chain_id == chain_id
    }
}

mod hex_chain_id {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(chain_id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_chain_id(*chain_id))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_chain_id(&raw).map_err(serde::de::Error::custom)
    }
}
