//! Network reconciliation worker
//!
//! Re-derives the wrong-network warning from provider ground truth. A fixed
//! poll interval and provider change notifications both feed one coalescing
//! trigger; reconciliation passes run strictly one at a time with a bounded
//! timeout, so a slow response can never overwrite a newer observation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use shared::types::error::WalletError;
use shared::types::network::NetworkDescriptor;
use shared::types::session::WarningState;

use crate::provider::{WalletProvider, WalletProviderExt};

#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub pass_timeout: Duration,
}

pub struct NetworkMonitor {
    provider: Option<Arc<dyn WalletProvider>>,
    network: NetworkDescriptor,
    warning: watch::Sender<WarningState>,
    settings: MonitorSettings,
}

impl NetworkMonitor {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        network: NetworkDescriptor,
        settings: MonitorSettings,
    ) -> Self {
        let (warning, _) = watch::channel(WarningState::hidden());
        Self {
            provider,
            network,
            warning,
            settings,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WarningState> {
        self.warning.subscribe()
    }

    pub fn snapshot(&self) -> WarningState {
        self.warning.borrow().clone()
    }

    /// One reconciliation pass. Failures and timeouts degrade to a hidden
    /// warning; they never take the worker down.
    pub async fn reconcile(&self) {
        let next = match tokio::time::timeout(self.settings.pass_timeout, self.probe()).await {
            Ok(Ok(state)) => state,
            Ok(Err(err)) => {
                warn!("Network check failed: {}", err);
                WarningState::hidden()
            }
            Err(_) => {
                warn!(
                    "Network check timed out after {:?}",
                    self.settings.pass_timeout
                );
                WarningState::hidden()
            }
        };
        self.publish(next);
    }

    async fn probe(&self) -> Result<WarningState, WalletError> {
        let Some(provider) = &self.provider else {
            return Ok(WarningState::hidden());
        };

        let accounts = provider.accounts().await?;
        if accounts.is_empty() {
            return Ok(WarningState::hidden());
        }

        let chain_id = provider.chain_id().await?;
        Ok(WarningState::for_chain(chain_id, self.network.chain_id))
    }

    fn publish(&self, next: WarningState) {
        self.warning.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            if next.visible && !state.visible {
                warn!(
                    chain_id = ?next.current_chain_id,
                    chain_name = ?next.current_chain_name,
                    "Wrong network detected; expected {}",
                    self.network.chain_name
                );
            } else if !next.visible && state.visible {
                info!("Network warning cleared");
            }
            *state = next;
            true
        });
    }

    /// Ask the wallet to activate the expected chain, registering it first
    /// when the wallet does not know it (provider error code 4902).
    pub async fn switch_to_expected(&self) -> Result<(), WalletError> {
        let provider = self
            .provider
            .clone()
            .ok_or(WalletError::ProviderUnavailable)?;

        let current = provider.chain_id().await?;
        if self.network.matches(current) {
            return Ok(());
        }

        info!(
            "Requesting switch to {} ({})",
            self.network.chain_name,
            self.network.chain_id_hex()
        );
        match provider.switch_chain(self.network.chain_id).await {
            Ok(()) => Ok(()),
            Err(WalletError::UnrecognizedChain(_)) => {
                info!(
                    "{} is not registered in the wallet; requesting chain add",
                    self.network.chain_name
                );
                provider.add_chain(&self.network).await.map_err(|err| match err {
                    rejected @ WalletError::UserRejected(_) => rejected,
                    other => WalletError::AddChainFailed(format!(
                        "failed to add {} to the wallet: {}",
                        self.network.chain_name, other
                    )),
                })
            }
            Err(rejected @ WalletError::UserRejected(_)) => Err(rejected),
            Err(other) => Err(WalletError::SwitchFailed(format!(
                "failed to switch to {}: {}",
                self.network.chain_name, other
            ))),
        }
    }
}

/// Run the reconciliation loop until the worker is dropped.
pub async fn start(monitor: Arc<NetworkMonitor>) -> Result<()> {
    info!("Network monitor worker started");

    let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);

    {
        let trigger = trigger_tx.clone();
        let poll_interval = monitor.settings.poll_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match trigger.try_send(()) {
                    Ok(()) | Err(TrySendError::Full(())) => {}
                    Err(TrySendError::Closed(())) => break,
                }
            }
        });
    }

    if let Some(provider) = &monitor.provider {
        let mut events = provider.subscribe();
        let trigger = trigger_tx.clone();
        tokio::spawn(async move {
            loop {
                let nudge = match events.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => true,
                    Err(broadcast::error::RecvError::Closed) => false,
                };
                if !nudge {
                    break;
                }
                if let Err(TrySendError::Closed(())) = trigger.try_send(()) {
                    break;
                }
            }
        });
    }
    drop(trigger_tx);

    monitor.reconcile().await;

    while trigger_rx.recv().await.is_some() {
        // Collapse the burst: a poll tick landing on top of a provider
        // event produces a single pass.
        tokio::time::sleep(monitor.settings.debounce).await;
        while trigger_rx.try_recv().is_ok() {}
        monitor.reconcile().await;
    }

    info!("Network monitor worker stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use crate::provider::{MockWalletProvider, ProviderEvent};
    use shared::types::network::format_chain_id;

    struct Script {
        chain_id: AtomicU64,
        accounts: StdMutex<Vec<String>>,
        failing: AtomicBool,
    }

    impl Script {
        fn new(chain_id: u64, accounts: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                chain_id: AtomicU64::new(chain_id),
                accounts: StdMutex::new(accounts.iter().map(|a| a.to_string()).collect()),
                failing: AtomicBool::new(false),
            })
        }

        fn set_chain(&self, chain_id: u64) {
            self.chain_id.store(chain_id, Ordering::SeqCst);
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    fn scripted_provider(script: Arc<Script>) -> MockWalletProvider {
        let mut mock = MockWalletProvider::new();
        mock.expect_request().returning(move |method, _| {
            if script.failing.load(Ordering::SeqCst) {
                return Err(WalletError::Rpc("node unreachable".to_string()));
            }
            match method {
                "eth_accounts" => Ok(json!(script.accounts.lock().unwrap().clone())),
                "eth_chainId" => {
                    Ok(json!(format_chain_id(script.chain_id.load(Ordering::SeqCst))))
                }
                other => Err(WalletError::Rpc(format!("unexpected method {}", other))),
            }
        });
        mock.expect_subscribe()
            .returning(|| broadcast::channel(8).1);
        mock
    }

    fn settings() -> MonitorSettings {
        MonitorSettings {
            poll_interval: Duration::from_secs(60),
            debounce: Duration::from_millis(10),
            pass_timeout: Duration::from_secs(1),
        }
    }

    fn monitor_over(mock: MockWalletProvider) -> NetworkMonitor {
        NetworkMonitor::new(
            Some(Arc::new(mock)),
            NetworkDescriptor::rootstock_testnet(),
            settings(),
        )
    }

    #[tokio::test]
    async fn test_wrong_network_raises_warning() {
        let script = Script::new(1, &["0xAbc"]);
        let monitor = monitor_over(scripted_provider(script));

        monitor.reconcile().await;

        let warning = monitor.snapshot();
        assert!(warning.visible);
        assert_eq!(warning.current_chain_id, Some(1));
        assert_eq!(warning.current_chain_name.as_deref(), Some("Ethereum Mainnet"));
    }

    #[tokio::test]
    async fn test_expected_network_keeps_warning_hidden() {
        let script = Script::new(31, &["0xAbc"]);
        let monitor = monitor_over(scripted_provider(script));

        monitor.reconcile().await;

        assert_eq!(monitor.snapshot(), WarningState::hidden());
    }

    #[tokio::test]
    async fn test_no_accounts_hides_warning() {
        let script = Script::new(1, &[]);
        let monitor = monitor_over(scripted_provider(script));

        monitor.reconcile().await;

        assert_eq!(monitor.snapshot(), WarningState::hidden());
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_hidden() {
        let script = Script::new(1, &["0xAbc"]);
        let monitor = monitor_over(scripted_provider(script.clone()));
        monitor.reconcile().await;
        assert!(monitor.snapshot().visible);

        script.set_failing(true);
        monitor.reconcile().await;

        assert_eq!(monitor.snapshot(), WarningState::hidden());

        // The loop is still alive: the next healthy pass re-raises the warning.
        script.set_failing(false);
        monitor.reconcile().await;
        assert!(monitor.snapshot().visible);
    }

    #[tokio::test]
    async fn test_without_provider_warning_stays_hidden() {
        let monitor = NetworkMonitor::new(None, NetworkDescriptor::rootstock_testnet(), settings());

        monitor.reconcile().await;

        assert_eq!(monitor.snapshot(), WarningState::hidden());
    }

    fn switching_provider(
        current_chain: &'static str,
        switch_result: fn() -> Result<Value, WalletError>,
        add_result: fn() -> Result<Value, WalletError>,
        switch_calls: Arc<AtomicUsize>,
        add_calls: Arc<AtomicUsize>,
    ) -> MockWalletProvider {
        let expected_add_params = json!([NetworkDescriptor::rootstock_testnet()]);
        let mut mock = MockWalletProvider::new();
        mock.expect_request().returning(move |method, params| match method {
            "eth_chainId" => Ok(json!(current_chain)),
            "wallet_switchEthereumChain" => {
                switch_calls.fetch_add(1, Ordering::SeqCst);
                assert_eq!(params, json!([{ "chainId": "0x1f" }]));
                switch_result()
            }
            "wallet_addEthereumChain" => {
                add_calls.fetch_add(1, Ordering::SeqCst);
                assert_eq!(params, expected_add_params);
                add_result()
            }
            other => Err(WalletError::Rpc(format!("unexpected method {}", other))),
        });
        mock.expect_subscribe()
            .returning(|| broadcast::channel(8).1);
        mock
    }

    #[tokio::test]
    async fn test_switch_succeeds_without_add() {
        let switch_calls = Arc::new(AtomicUsize::new(0));
        let add_calls = Arc::new(AtomicUsize::new(0));
        let monitor = monitor_over(switching_provider(
            "0x1",
            || Ok(Value::Null),
            || Ok(Value::Null),
            switch_calls.clone(),
            add_calls.clone(),
        ));

        monitor.switch_to_expected().await.unwrap();

        assert_eq!(switch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(add_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unrecognized_chain_falls_back_to_add() {
        let switch_calls = Arc::new(AtomicUsize::new(0));
        let add_calls = Arc::new(AtomicUsize::new(0));
        let monitor = monitor_over(switching_provider(
            "0x1",
            || {
                Err(WalletError::from_provider_code(
                    4902,
                    "Unrecognized chain ID".to_string(),
                ))
            },
            || Ok(Value::Null),
            switch_calls.clone(),
            add_calls.clone(),
        ));

        monitor.switch_to_expected().await.unwrap();

        assert_eq!(switch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(add_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_add_failure_surfaces_descriptive_error() {
        let switch_calls = Arc::new(AtomicUsize::new(0));
        let add_calls = Arc::new(AtomicUsize::new(0));
        let monitor = monitor_over(switching_provider(
            "0x1",
            || {
                Err(WalletError::from_provider_code(
                    4902,
                    "Unrecognized chain ID".to_string(),
                ))
            },
            || Err(WalletError::Rpc("wallet refused".to_string())),
            switch_calls.clone(),
            add_calls.clone(),
        ));

        let err = monitor.switch_to_expected().await.unwrap_err();

        assert!(matches!(err, WalletError::AddChainFailed(_)));
        assert!(err.to_string().contains("Rootstock Testnet"));
        assert_eq!(add_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_switch_rejection_propagates_as_user_rejected() {
        let switch_calls = Arc::new(AtomicUsize::new(0));
        let add_calls = Arc::new(AtomicUsize::new(0));
        let monitor = monitor_over(switching_provider(
            "0x1",
            || {
                Err(WalletError::from_provider_code(
                    4001,
                    "User rejected the request".to_string(),
                ))
            },
            || Ok(Value::Null),
            switch_calls.clone(),
            add_calls.clone(),
        ));

        let err = monitor.switch_to_expected().await.unwrap_err();

        assert!(matches!(err, WalletError::UserRejected(_)));
        assert_eq!(add_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_switch_is_noop_when_already_on_target() {
        let switch_calls = Arc::new(AtomicUsize::new(0));
        let add_calls = Arc::new(AtomicUsize::new(0));
        let monitor = monitor_over(switching_provider(
            "0x1f",
            || Err(WalletError::Rpc("should not be called".to_string())),
            || Err(WalletError::Rpc("should not be called".to_string())),
            switch_calls.clone(),
            add_calls.clone(),
        ));

        monitor.switch_to_expected().await.unwrap();

        assert_eq!(switch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(add_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chain_changed_event_raises_warning_within_one_pass() {
        let script = Script::new(31, &["0xAbc"]);
        let (events_tx, _keep_alive) = broadcast::channel(8);

        let mut mock = MockWalletProvider::new();
        mock.expect_request().returning({
            let script = script.clone();
            move |method, _| match method {
                "eth_accounts" => Ok(json!(script.accounts.lock().unwrap().clone())),
                "eth_chainId" => {
                    Ok(json!(format_chain_id(script.chain_id.load(Ordering::SeqCst))))
                }
                other => Err(WalletError::Rpc(format!("unexpected method {}", other))),
            }
        });
        mock.expect_subscribe().returning({
            let events_tx = events_tx.clone();
            move || events_tx.subscribe()
        });

        let monitor = Arc::new(monitor_over(mock));
        let mut warnings = monitor.subscribe();
        let worker = tokio::spawn(start(monitor.clone()));
        // Let the worker subscribe before the event is emitted.
        tokio::time::sleep(Duration::from_millis(100)).await;

        script.set_chain(1);
        events_tx
            .send(ProviderEvent::ChainChanged("0x1".to_string()))
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), warnings.changed())
            .await
            .expect("monitor should react to the chain change")
            .unwrap();
        let warning = warnings.borrow().clone();
        assert!(warning.visible);
        assert_eq!(warning.current_chain_id, Some(1));

        worker.abort();
    }
}
