//! Shared type definitions for the bounty board wallet services
//!
//! This module contains the data structures used across the wallet layer:
//!
//! - Target network descriptors and chain-id plumbing
//! - Wallet session and network-warning snapshots
//! - The wallet error taxonomy

pub mod error;
pub mod network;
pub mod session;

// Re-export commonly used types for easier imports
pub use error::{WalletError, WalletResult};
pub use network::{
    format_chain_id, known_chain_name, parse_chain_id, NativeCurrency, NetworkDescriptor,
    ROOTSTOCK_TESTNET_CHAIN_ID,
};
pub use session::{SessionState, WarningState};

pub type Result<T> = std::result::Result<T, WalletError>;
