//! Wallet session service
//!
//! An explicitly constructed session object owning the provider handle, the
//! connected address, the active chain id, and the derived correct-network
//! flag. Consumers subscribe to a watch channel; every mutation publishes a
//! fresh snapshot, so all dependents re-read consistent state.

use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use shared::types::error::WalletError;
use shared::types::network::{parse_chain_id, NetworkDescriptor};
use shared::types::session::SessionState;

use crate::provider::{ProviderEvent, WalletProvider, WalletProviderExt};
use crate::storage::AddressHintStore;

pub struct WalletSession {
    /// `None` models the absence of an installed wallet.
    provider: Option<Arc<dyn WalletProvider>>,
    network: NetworkDescriptor,
    hints: AddressHintStore,
    state: watch::Sender<SessionState>,
    /// Serializes session mutations so a provider event racing a connect
    /// cannot interleave half-applied snapshots.
    update_lock: Mutex<()>,
}

impl WalletSession {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        network: NetworkDescriptor,
        hints: AddressHintStore,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::disconnected());
        Self {
            provider,
            network,
            hints,
            state,
            update_lock: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Check for an already-authorized wallet without prompting, and seed the
    /// session from it. Query failures are logged and leave the session
    /// disconnected.
    pub async fn initialize(&self) {
        let Some(provider) = self.provider.clone() else {
            debug!("No wallet provider detected; session stays disconnected");
            return;
        };

        match self.hints.load() {
            Ok(Some(address)) => debug!("Last session connected as {}", address),
            Ok(None) => {}
            Err(err) => warn!("Failed to read address hint: {}", err),
        }

        let _guard = self.update_lock.lock().await;
        let accounts = match provider.accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                warn!("Failed to check wallet connection: {}", err);
                return;
            }
        };
        let Some(address) = accounts.into_iter().next() else {
            return;
        };
        match provider.chain_id().await {
            Ok(chain_id) => {
                info!(
                    address = %address,
                    chain_id,
                    correct = self.network.matches(chain_id),
                    "Connected to network"
                );
                self.state
                    .send_replace(SessionState::connected(address, chain_id, self.network.chain_id));
            }
            Err(err) => warn!("Failed to read network during session init: {}", err),
        }
    }

    /// Request account access from the wallet. On success the session is
    /// fully repopulated and the address hint persisted.
    pub async fn connect(&self) -> Result<SessionState, WalletError> {
        let provider = self
            .provider
            .clone()
            .ok_or(WalletError::ProviderUnavailable)?;
        let _guard = self.update_lock.lock().await;

        let accounts = provider.request_accounts().await?;
        let Some(address) = accounts.into_iter().next() else {
            // The wallet granted the request but exposed no accounts.
            return Ok(self.snapshot());
        };
        let chain_id = provider.chain_id().await?;

        if let Err(err) = self.hints.save(&address) {
            warn!("Failed to persist address hint: {}", err);
        }

        let next = SessionState::connected(address, chain_id, self.network.chain_id);
        info!(
            address = %next.address,
            chain_id,
            correct = next.is_correct_network,
            "Wallet connected"
        );
        self.state.send_replace(next.clone());
        Ok(next)
    }

    /// Clear the session, remove the persisted hint, and raise the
    /// disconnect notice for the consuming UI.
    pub async fn disconnect(&self) {
        let _guard = self.update_lock.lock().await;

        if let Err(err) = self.hints.clear() {
            warn!("Failed to remove address hint: {}", err);
        }

        let mut next = SessionState::disconnected();
        next.show_disconnect_notice = true;
        info!("Wallet disconnected");
        self.state.send_replace(next);
    }

    /// Consume the disconnect notice once the user has seen it.
    pub async fn acknowledge_disconnect_notice(&self) {
        let _guard = self.update_lock.lock().await;
        self.state.send_if_modified(|state| {
            let was_showing = state.show_disconnect_notice;
            state.show_disconnect_notice = false;
            was_showing
        });
    }

    /// Re-derive the whole session from provider ground truth. Used after
    /// chain switches, where cached handles are not safely reusable.
    pub async fn refresh(&self) {
        let Some(provider) = self.provider.clone() else {
            return;
        };
        let _guard = self.update_lock.lock().await;

        let accounts = match provider.accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                warn!("Session refresh failed: {}", err);
                return;
            }
        };

        let next = match accounts.into_iter().next() {
            None => {
                let mut cleared = SessionState::disconnected();
                cleared.show_disconnect_notice = self.state.borrow().show_disconnect_notice;
                cleared
            }
            Some(address) => match provider.chain_id().await {
                Ok(chain_id) => SessionState::connected(address, chain_id, self.network.chain_id),
                Err(err) => {
                    warn!("Session refresh failed: {}", err);
                    return;
                }
            },
        };

        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
    }

    /// Provider reported a chain switch.
    pub async fn handle_chain_changed(&self, raw_chain_id: &str) {
        match parse_chain_id(raw_chain_id) {
            Ok(chain_id) => info!("Network changed to chain id {}", chain_id),
            Err(_) => warn!("Malformed chain id from provider: {}", raw_chain_id),
        }
        self.refresh().await;
    }

    /// Provider reported a change in the authorized account list. An empty
    /// list is a full revocation and disconnects the session.
    pub async fn handle_accounts_changed(&self, accounts: Vec<String>) {
        match accounts.first() {
            None => self.disconnect().await,
            Some(address) => {
                if let Err(err) = self.hints.save(address) {
                    warn!("Failed to persist address hint: {}", err);
                }
                self.refresh().await;
            }
        }
    }

    /// Consume provider notifications for the life of the session. Returns
    /// `None` when no provider is installed.
    pub fn spawn_event_loop(self: Arc<Self>) -> Option<JoinHandle<()>> {
        let provider = self.provider.clone()?;
        let mut events = provider.subscribe();

        Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ProviderEvent::ChainChanged(raw)) => {
                        self.handle_chain_changed(&raw).await;
                    }
                    Ok(ProviderEvent::AccountsChanged(accounts)) => {
                        self.handle_accounts_changed(accounts).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Dropped {} provider events; refreshing session", skipped);
                        self.refresh().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }
}
