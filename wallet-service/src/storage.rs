//! File-backed persistence for the soft-reconnect address hint
//!
//! The hint mirrors the last connected address so the next start can show it
//! before the provider answers. It is advisory only; the provider remains
//! the source of truth for which accounts are authorized.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use shared::types::error::WalletError;

#[derive(Debug, Serialize, Deserialize)]
struct AddressHint {
    #[serde(rename = "walletAddress")]
    wallet_address: String,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AddressHintStore {
    path: PathBuf,
}

impl AddressHintStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist the address of the account that just connected.
    pub fn save(&self, address: &str) -> Result<(), WalletError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let hint = AddressHint {
            wallet_address: address.to_string(),
            updated_at: Utc::now(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&hint)?)?;
        debug!("Address hint saved for {}", address);
        Ok(())
    }

    /// The last persisted address, if any. A corrupt file is treated as no
    /// hint at all; it is advisory data.
    pub fn load(&self) -> Result<Option<String>, WalletError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str::<AddressHint>(&raw) {
            Ok(hint) => Ok(Some(hint.wallet_address)),
            Err(err) => {
                debug!("Discarding unreadable address hint: {}", err);
                Ok(None)
            }
        }
    }

    /// Remove the hint. Removing an absent hint is not an error.
    pub fn clear(&self) -> Result<(), WalletError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
