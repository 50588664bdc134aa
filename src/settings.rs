//! User settings file.
//!
//! Stored as TOML in `~/.walletlogin/config.toml`. Every field is optional;
//! env vars override whatever is set here.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::handshake::MessageFormat;

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    /// URL of the EIP-1193 JSON-RPC wallet bridge.
    #[serde(default)]
    pub wallet_rpc_url: Option<String>,

    /// Timeout for the wallet availability probe, in milliseconds.
    #[serde(default)]
    pub probe_timeout_ms: Option<u64>,

    /// Authorization endpoint path, absolute or relative to the login page.
    #[serde(default)]
    pub authorize_path: Option<String>,

    #[serde(default)]
    pub message_format: Option<MessageFormat>,

    /// Whether the proof carries the wallet's chain id.
    #[serde(default)]
    pub include_chain_id: Option<bool>,

    /// Open the authorization URL in the system browser.
    #[serde(default)]
    pub open_browser: Option<bool>,
}

impl Settings {
    /// Default TOML config file path (~/.walletlogin/config.toml).
    pub fn default_toml_path() -> PathBuf {
        crate::bootstrap::walletlogin_home().join("config.toml")
    }

    /// Load settings from a TOML file.
    ///
    /// Returns `None` if the file doesn't exist. Returns an error only
    /// if the file exists but can't be read or parsed.
    pub fn load_toml(path: &Path) -> Result<Option<Self>, String> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {}", path.display(), e)),
        };

        toml::from_str(&data)
            .map(Some)
            .map_err(|e| format!("invalid TOML in {}: {}", path.display(), e))
    }

    /// Overlay every field that is set in `other`.
    pub fn merge_from(&mut self, other: &Self) {
        if other.wallet_rpc_url.is_some() {
            self.wallet_rpc_url = other.wallet_rpc_url.clone();
        }
        if other.probe_timeout_ms.is_some() {
            self.probe_timeout_ms = other.probe_timeout_ms;
        }
        if other.authorize_path.is_some() {
            self.authorize_path = other.authorize_path.clone();
        }
        if other.message_format.is_some() {
            self.message_format = other.message_format;
        }
        if other.include_chain_id.is_some() {
            self.include_chain_id = other.include_chain_id;
        }
        if other.open_browser.is_some() {
            self.open_browser = other.open_browser;
        }
    }
}
