//! JSON-RPC wallet provider adapter
//!
//! Wraps an `ethers` HTTP transport behind the [`WalletProvider`] trait and
//! synthesizes EIP-1193 change notifications by watching the endpoint for
//! chain or account changes, the same way a browser extension emits
//! `chainChanged` / `accountsChanged` from its own internal polling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::providers::{Http, Provider, ProviderError, RpcError};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use shared::types::error::WalletError;
use shared::types::network::format_chain_id;

use super::{ProviderEvent, WalletProvider, WalletProviderExt};

const EVENT_CHANNEL_CAPACITY: usize = 16;

pub struct JsonRpcWalletProvider {
    transport: Provider<Http>,
    events: broadcast::Sender<ProviderEvent>,
    request_timeout: Duration,
}

impl JsonRpcWalletProvider {
    /// Build a provider over an HTTP JSON-RPC endpoint.
    pub fn connect(url: &str, request_timeout: Duration) -> Result<Self, WalletError> {
        let transport = Provider::<Http>::try_from(url)
            .map_err(|e| WalletError::Rpc(format!("invalid provider url {}: {}", url, e)))?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            transport,
            events,
            request_timeout,
        })
    }

    /// Verify the endpoint is reachable and report which chain it serves.
    /// A mismatch against the expected chain is the monitor's business, not
    /// a startup failure.
    pub async fn verify(&self, expected_chain_id: u64) -> Result<u64, WalletError> {
        let chain_id = self.chain_id().await?;
        info!("Connected to wallet provider with chain ID: {}", chain_id);
        if chain_id != expected_chain_id {
            warn!(
                "Provider chain {} differs from expected chain {}",
                chain_id, expected_chain_id
            );
        }
        Ok(chain_id)
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let call = self.transport.request::<_, Value>(method, params);
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(map_transport_error(method, err)),
            Err(_) => Err(WalletError::Rpc(format!(
                "{} timed out after {:?}",
                method, self.request_timeout
            ))),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

fn map_transport_error(method: &str, err: ProviderError) -> WalletError {
    if let Some(rpc) = err.as_error_response() {
        return WalletError::from_provider_code(rpc.code, rpc.message.clone());
    }
    WalletError::Rpc(format!("{} failed: {}", method, err))
}

/// Watch the endpoint for chain/account changes and broadcast them as
/// provider events. Query failures are transient by definition here: they
/// are logged and the previous observation is kept.
pub fn spawn_refresh_task(
    provider: Arc<JsonRpcWalletProvider>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_chain: Option<u64> = None;
        let mut last_accounts: Option<Vec<String>> = None;

        loop {
            ticker.tick().await;

            match provider.chain_id().await {
                Ok(chain_id) => {
                    if last_chain.is_some() && last_chain != Some(chain_id) {
                        debug!("Provider chain changed to {}", chain_id);
                        let _ = provider
                            .events
                            .send(ProviderEvent::ChainChanged(format_chain_id(chain_id)));
                    }
                    last_chain = Some(chain_id);
                }
                Err(err) => debug!("Chain refresh failed: {}", err),
            }

            match provider.accounts().await {
                Ok(accounts) => {
                    if last_accounts.is_some() && last_accounts.as_ref() != Some(&accounts) {
                        debug!("Provider accounts changed ({} authorized)", accounts.len());
                        let _ = provider
                            .events
                            .send(ProviderEvent::AccountsChanged(accounts.clone()));
                    }
                    last_accounts = Some(accounts);
                }
                Err(err) => debug!("Accounts refresh failed: {}", err),
            }
        }
    })
}
