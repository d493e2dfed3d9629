mod config;
mod provider;
mod services;
mod storage;
mod workers;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use shared::observability::{init_service_logging, LogFormat};

use crate::config::Config;
use crate::provider::rpc::{self, JsonRpcWalletProvider};
use crate::provider::WalletProvider;
use crate::services::wallet_session::WalletSession;
use crate::storage::AddressHintStore;
use crate::workers::network_monitor::{self, MonitorSettings, NetworkMonitor};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    let log_format: LogFormat = config.service.log_format.parse()?;
    init_service_logging(&config.service.name, log_format)?;

    info!("Starting Wallet Service...");
    info!("Configuration loaded successfully");

    let network = config.network.descriptor();
    let community_address = config.contract.community_address()?;
    info!(
        network = %network.chain_name,
        chain_id = network.chain_id,
        contract = %community_address,
        "Bounty board target configured"
    );

    // Detect the wallet provider; without one the session stays disconnected
    // and every surface degrades gracefully.
    let provider: Option<Arc<JsonRpcWalletProvider>> = match &config.provider.url {
        Some(url) => {
            let provider = Arc::new(JsonRpcWalletProvider::connect(
                url,
                Duration::from_secs(config.provider.request_timeout_secs),
            )?);
            provider.verify(network.chain_id).await?;
            rpc::spawn_refresh_task(
                provider.clone(),
                Duration::from_secs(config.provider.refresh_interval_secs),
            );
            Some(provider)
        }
        None => {
            warn!("No wallet provider configured; running disconnected");
            None
        }
    };
    let provider: Option<Arc<dyn WalletProvider>> =
        provider.map(|p| p as Arc<dyn WalletProvider>);

    // Initialize the wallet session
    let hints = AddressHintStore::new(&config.session.hint_path);
    let session = Arc::new(WalletSession::new(
        provider.clone(),
        network.clone(),
        hints,
    ));
    session.initialize().await;
    let _session_events = session.clone().spawn_event_loop();
    info!("Wallet session initialized");

    // Start the network reconciliation worker
    let monitor = Arc::new(NetworkMonitor::new(
        provider.clone(),
        network.clone(),
        MonitorSettings {
            poll_interval: config.session.poll_interval(),
            debounce: config.session.reconcile_debounce(),
            pass_timeout: Duration::from_secs(config.provider.request_timeout_secs),
        },
    ));
    let monitor_clone = monitor.clone();
    tokio::spawn(async move {
        if let Err(e) = network_monitor::start(monitor_clone).await {
            warn!("Network monitor error: {}", e);
        }
    });

    // Surface transitions: subscribers re-read fresh snapshots, logs carry
    // the presentation the browser frontend renders.
    let mut session_states = session.subscribe();
    tokio::spawn(async move {
        while session_states.changed().await.is_ok() {
            let state = session_states.borrow().clone();
            info!(
                connected = state.connected,
                address = %state.address,
                chain_id = ?state.chain_id,
                correct_network = state.is_correct_network,
                disconnect_notice = state.show_disconnect_notice,
                "Session state changed"
            );
        }
    });

    let mut warnings = monitor.subscribe();
    let expected_name = network.chain_name.clone();
    tokio::spawn(async move {
        while warnings.changed().await.is_ok() {
            let warning = warnings.borrow().clone();
            if warning.visible {
                warn!(
                    current_chain = ?warning.current_chain_id,
                    current_name = ?warning.current_chain_name,
                    "Wrong network: switch to {} to use the bounty board",
                    expected_name
                );
            } else {
                info!("Network warning hidden");
            }
        }
    });

    info!("Background workers started");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping Wallet Service");

    Ok(())
}
