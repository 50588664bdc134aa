use std::sync::Arc;
use std::time::Duration;

use crate::config::helpers::{first_non_empty_env, optional_env};
use crate::error::ConfigError;
use crate::settings::Settings;
use crate::wallet::{Eip1193RpcGateway, NoWalletProvider, WalletGateway};

const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;

/// Wallet bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConfig {
    /// EIP-1193 JSON-RPC bridge. `None` means no wallet is installed.
    pub rpc_url: Option<String>,
    pub probe_timeout: Duration,
}

impl WalletConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let rpc_url = first_non_empty_env(&["WALLETLOGIN_WALLET_RPC_URL", "WALLET_RPC_URL"])?
            .or_else(|| settings.wallet_rpc_url.clone())
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty());
        if let Some(ref raw) = rpc_url {
            let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
                key: "WALLETLOGIN_WALLET_RPC_URL".to_string(),
                message: format!("must be an absolute URL: {e}"),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidValue {
                    key: "WALLETLOGIN_WALLET_RPC_URL".to_string(),
                    message: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }
        }

        let probe_timeout_ms = optional_env("WALLETLOGIN_PROBE_TIMEOUT_MS")?
            .map(|s| s.trim().parse::<u64>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "WALLETLOGIN_PROBE_TIMEOUT_MS".to_string(),
                message: format!("must be a positive integer: {e}"),
            })?
            .or(settings.probe_timeout_ms)
            .unwrap_or(DEFAULT_PROBE_TIMEOUT_MS);
        if probe_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "WALLETLOGIN_PROBE_TIMEOUT_MS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            rpc_url,
            probe_timeout: Duration::from_millis(probe_timeout_ms),
        })
    }

    /// Build the gateway the handshake talks to.
    pub fn gateway(&self) -> Arc<dyn WalletGateway> {
        match &self.rpc_url {
            Some(url) => Arc::new(Eip1193RpcGateway::new(url.clone(), self.probe_timeout)),
            None => Arc::new(NoWalletProvider),
        }
    }
}
