//! Wallet provider capability.
//!
//! The handshake never talks to a wallet directly; it is handed an
//! `Arc<dyn WalletGateway>` so the real provider bridge and test doubles are
//! interchangeable.

pub mod rpc;

use async_trait::async_trait;

use crate::error::WalletError;

pub use self::rpc::Eip1193RpcGateway;

/// Operations a login page needs from an installed wallet.
#[async_trait]
pub trait WalletGateway: Send + Sync {
    /// Whether a provider is present at all.
    async fn is_available(&self) -> bool;

    /// Ask the user to authorize account access. Suspends until the user
    /// answers in the wallet UI.
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Network the wallet is currently connected to. May be stale if the
    /// user switches networks mid-flow.
    async fn current_chain_id(&self) -> Result<u64, WalletError>;

    /// Request a personal-message signature from `account`. Suspends until
    /// the user approves or rejects.
    async fn sign_message(&self, message: &str, account: &str) -> Result<String, WalletError>;
}

/// Account selected for one login attempt. Never cached across attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletAccount {
    pub address: String,
    pub chain_id: Option<u64>,
}

/// Gateway used when no wallet is installed or configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWalletProvider;

#[async_trait]
impl WalletGateway for NoWalletProvider {
    async fn is_available(&self) -> bool {
        false
    }

    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        Err(WalletError::ProviderUnavailable(
            "no wallet provider configured".to_string(),
        ))
    }

    async fn current_chain_id(&self) -> Result<u64, WalletError> {
        Err(WalletError::ProviderUnavailable(
            "no wallet provider configured".to_string(),
        ))
    }

    async fn sign_message(&self, _message: &str, _account: &str) -> Result<String, WalletError> {
        Err(WalletError::ProviderUnavailable(
            "no wallet provider configured".to_string(),
        ))
    }
}

/// `0x` followed by exactly 40 hex digits.
pub fn looks_like_evm_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Shorten a signature for log output.
pub(crate) fn redact_signature(signature: &str) -> String {
    if signature.len() <= 14 {
        return signature.to_string();
    }
    match (signature.get(..10), signature.get(signature.len() - 4..)) {
        (Some(head), Some(tail)) => format!("{head}…{tail}"),
        _ => "<signature>".to_string(),
    }
}
