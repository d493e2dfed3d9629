//! Shared types and utilities for the bounty board wallet services

// Re-export common dependencies
pub use anyhow;
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tracing;

pub mod observability;
pub mod types;

pub use types::error::{WalletError, WalletResult};
pub use types::network::{NativeCurrency, NetworkDescriptor};
pub use types::session::{SessionState, WarningState};
