//! Configuration for walletlogin.
//!
//! Settings are loaded with priority: env var > TOML config file > default.
//! `./.env` and `~/.walletlogin/.env` are loaded via dotenvy before anything
//! is resolved.

mod handshake;
pub(crate) mod helpers;
mod wallet;

use std::path::Path;

use crate::error::ConfigError;
use crate::settings::Settings;

pub use self::handshake::HandshakeConfig;
pub use self::wallet::WalletConfig;

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub wallet: WalletConfig,
    pub handshake: HandshakeConfig,
}

impl Config {
    /// Load from env with an optional TOML config file overlay. `None` reads
    /// `~/.walletlogin/config.toml` when it exists.
    pub fn from_env_with_toml(toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        crate::bootstrap::load_walletlogin_env();
        let mut settings = Settings::default();
        Self::apply_toml_overlay(&mut settings, toml_path)?;
        Self::build(&settings)
    }

    /// Load and merge a TOML config file into settings.
    ///
    /// If `explicit_path` is `Some`, loads from that path (errors are fatal).
    /// If `None`, tries the default path `~/.walletlogin/config.toml`
    /// (missing file is silently ignored).
    fn apply_toml_overlay(
        settings: &mut Settings,
        explicit_path: Option<&Path>,
    ) -> Result<(), ConfigError> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Settings::default_toml_path);

        match Settings::load_toml(&path) {
            Ok(Some(toml_settings)) => {
                settings.merge_from(&toml_settings);
                tracing::debug!("Loaded TOML config from {}", path.display());
            }
            Ok(None) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
            }
            Err(e) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Failed to load config file {}: {}",
                        path.display(),
                        e
                    )));
                }
                tracing::warn!("Failed to load default config file: {}", e);
            }
        }
        Ok(())
    }

    /// Build config from settings.
    pub fn build(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            wallet: WalletConfig::resolve(settings)?,
            handshake: HandshakeConfig::resolve(settings)?,
        })
    }
}
