//! Wallet provider seam
//!
//! The session and the network monitor only ever talk to a wallet through
//! this trait: a single JSON-RPC style `request` entry point plus a stream
//! of change notifications, mirroring the EIP-1193 surface browser wallets
//! expose.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use shared::types::error::WalletError;
use shared::types::network::{format_chain_id, parse_chain_id, NetworkDescriptor};

pub mod rpc;

/// Notifications a wallet pushes at its consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The active chain changed; carries the new chain id as wallets emit
    /// it (hex string).
    ChainChanged(String),
    /// The authorized account list changed. Empty means the user revoked
    /// access entirely.
    AccountsChanged(Vec<String>),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Single JSON-RPC entry point, the Rust shape of
    /// `provider.request({ method, params })`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;

    /// Subscribe to provider-pushed change notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Typed wrappers over the raw `request` entry point. Blanket-implemented so
/// every provider, mocks included, routes through the same wire methods.
#[async_trait]
pub trait WalletProviderExt: WalletProvider {
    /// Accounts already authorized for this origin. Never prompts.
    async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        let value = self.request("eth_accounts", json!([])).await?;
        parse_accounts(value)
    }

    /// The active chain id.
    async fn chain_id(&self) -> Result<u64, WalletError> {
        let value = self.request("eth_chainId", json!([])).await?;
        let raw = value
            .as_str()
            .ok_or_else(|| WalletError::Rpc(format!("malformed eth_chainId response: {}", value)))?;
        parse_chain_id(raw)
    }

    /// Ask the wallet to authorize accounts; prompts the user.
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let value = self.request("eth_requestAccounts", json!([])).await?;
        parse_accounts(value)
    }

    /// Ask the wallet to activate the given chain.
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        self.request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": format_chain_id(chain_id) }]),
        )
        .await
        .map(|_| ())
    }

    /// Register a chain definition with the wallet.
    async fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), WalletError> {
        self.request("wallet_addEthereumChain", json!([network]))
            .await
            .map(|_| ())
    }
}

impl<P: WalletProvider + ?Sized> WalletProviderExt for P {}

fn parse_accounts(value: Value) -> Result<Vec<String>, WalletError> {
    serde_json::from_value(value.clone())
        .map_err(|_| WalletError::Rpc(format!("malformed accounts response: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn provider_returning(response: Value) -> MockWalletProvider {
        let mut mock = MockWalletProvider::new();
        mock.expect_request()
            .returning(move |_, _| Ok(response.clone()));
        mock
    }

    #[tokio::test]
    async fn test_accounts_parses_address_list() {
        let mock = provider_returning(json!(["0xabc", "0xdef"]));
        let accounts = mock.accounts().await.unwrap();
        assert_eq!(accounts, vec!["0xabc".to_string(), "0xdef".to_string()]);
    }

    #[tokio::test]
    async fn test_accounts_rejects_malformed_response() {
        let mock = provider_returning(json!({"not": "a list"}));
        assert!(matches!(mock.accounts().await, Err(WalletError::Rpc(_))));
    }

    #[tokio::test]
    async fn test_chain_id_parses_hex() {
        let mock = provider_returning(json!("0x1f"));
        assert_eq!(mock.chain_id().await.unwrap(), 31);
    }

    #[tokio::test]
    async fn test_switch_chain_sends_hex_chain_id() {
        let mut mock = MockWalletProvider::new();
        mock.expect_request()
            .withf(|method, params| {
                method == "wallet_switchEthereumChain"
                    && *params == json!([{ "chainId": "0x1f" }])
            })
            .times(1)
            .returning(|_, _| Ok(Value::Null));

        mock.switch_chain(31).await.unwrap();
    }

    #[tokio::test]
    async fn test_add_chain_sends_full_descriptor() {
        let network = NetworkDescriptor::rootstock_testnet();
        let expected = json!([network]);

        let mut mock = MockWalletProvider::new();
        mock.expect_request()
            .withf(move |method, params| {
                method == "wallet_addEthereumChain" && *params == expected
            })
            .times(1)
            .returning(|_, _| Ok(Value::Null));

        mock.add_chain(&network).await.unwrap();
    }
}
