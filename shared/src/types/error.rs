//! Wallet error taxonomy for the bounty board services

use thiserror::Error;

/// EIP-1193 error code a wallet returns when the user dismisses a request.
pub const PROVIDER_CODE_USER_REJECTED: i64 = 4001;

/// EIP-1193 error code a wallet returns for a chain it has no definition for.
pub const PROVIDER_CODE_UNRECOGNIZED_CHAIN: i64 = 4902;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no wallet provider detected; please install a browser wallet extension")]
    ProviderUnavailable,

    #[error("request rejected by the user: {0}")]
    UserRejected(String),

    #[error("chain not recognized by the wallet: {0}")]
    UnrecognizedChain(String),

    #[error("network switch failed: {0}")]
    SwitchFailed(String),

    #[error("adding the network failed: {0}")]
    AddChainFailed(String),

    #[error("provider request failed: {0}")]
    Rpc(String),

    #[error("invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl WalletError {
    /// Map a JSON-RPC error object returned by the wallet onto the taxonomy.
    pub fn from_provider_code(code: i64, message: String) -> Self {
        match code {
            PROVIDER_CODE_USER_REJECTED => WalletError::UserRejected(message),
            PROVIDER_CODE_UNRECOGNIZED_CHAIN => WalletError::UnrecognizedChain(message),
            _ => WalletError::Rpc(format!("provider error {}: {}", code, message)),
        }
    }

    /// The EIP-1193 code this variant corresponds to, when there is one.
    pub fn provider_code(&self) -> Option<i64> {
        match self {
            WalletError::UserRejected(_) => Some(PROVIDER_CODE_USER_REJECTED),
            WalletError::UnrecognizedChain(_) => Some(PROVIDER_CODE_UNRECOGNIZED_CHAIN),
            _ => None,
        }
    }

    /// Whether retrying the same call later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::Rpc(_))
    }

    /// Whether the failure is something the user can act on directly,
    /// as opposed to a transient or programming fault.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            WalletError::ProviderUnavailable
                | WalletError::UserRejected(_)
                | WalletError::UnrecognizedChain(_)
        )
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        WalletError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::Storage(err.to_string())
    }
}

pub type WalletResult<T> = std::result::Result<T, WalletError>;
