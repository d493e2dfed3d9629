//! Snapshots published by the wallet session and the network monitor

use serde::{Deserialize, Serialize};

/// Point-in-time view of the wallet session.
///
/// Invariants:
/// - `is_correct_network` is true iff `chain_id` equals the expected chain.
/// - when `connected` is false, `address` is empty and `chain_id` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub connected: bool,
    pub address: String,
    pub chain_id: Option<u64>,
    pub is_correct_network: bool,
    pub show_disconnect_notice: bool,
}

impl SessionState {
    /// Cleared defaults: no provider interaction has happened, or the user
    /// disconnected and the notice has been acknowledged.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            address: String::new(),
            chain_id: None,
            is_correct_network: false,
            show_disconnect_notice: false,
        }
    }

    /// Snapshot for an authorized account on the given chain.
    pub fn connected(address: String, chain_id: u64, expected_chain_id: u64) -> Self {
        Self {
            connected: true,
            address,
            chain_id: Some(chain_id),
            is_correct_network: chain_id == expected_chain_id,
            show_disconnect_notice: false,
        }
    }

    /// Whether all fields sit at their cleared defaults, ignoring the
    /// disconnect notice flag.
    pub fn is_cleared(&self) -> bool {
        !self.connected && self.address.is_empty() && self.chain_id.is_none()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Derived visibility state for the wrong-network warning. Purely
/// presentational, recomputed on every reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningState {
    pub visible: bool,
    pub current_chain_id: Option<u64>,
    pub current_chain_name: Option<String>,
}

impl WarningState {
    pub fn hidden() -> Self {
        Self {
            visible: false,
            current_chain_id: None,
            current_chain_name: None,
        }
    }

    pub fn for_chain(chain_id: u64, expected_chain_id: u64) -> Self {
        Self {
            visible: chain_id != expected_chain_id,
            current_chain_id: Some(chain_id),
            current_chain_name: super::network::known_chain_name(chain_id).map(str::to_string),
        }
    }
}

impl Default for WarningState {
    fn default() -> Self {
        Self::hidden()
    }
}
