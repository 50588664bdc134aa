use crate::config::helpers::{optional_env, parse_bool};
use crate::error::ConfigError;
use crate::handshake::{HandshakeOptions, MessageFormat};
use crate::settings::Settings;

/// Protocol settings shared with the authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    pub authorize_path: String,
    pub message_format: MessageFormat,
    pub include_chain_id: bool,
    pub open_browser: bool,
}

impl HandshakeConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let authorize_path = optional_env("WALLETLOGIN_AUTHORIZE_PATH")?
            .or_else(|| settings.authorize_path.clone())
            .map(|raw| raw.trim().to_string())
            .unwrap_or_else(|| "/authorize".to_string());
        if authorize_path.is_empty() || authorize_path.contains(['?', '#']) {
            return Err(ConfigError::InvalidValue {
                key: "WALLETLOGIN_AUTHORIZE_PATH".to_string(),
                message: format!("must be a path without query or fragment, got '{authorize_path}'"),
            });
        }

        let message_format = match optional_env("WALLETLOGIN_MESSAGE_FORMAT")? {
            Some(raw) => MessageFormat::parse(&raw, "WALLETLOGIN_MESSAGE_FORMAT")?,
            None => settings.message_format.unwrap_or_default(),
        };

        let include_chain_id = match optional_env("WALLETLOGIN_INCLUDE_CHAIN_ID")? {
            Some(raw) => parse_bool(&raw, "WALLETLOGIN_INCLUDE_CHAIN_ID")?,
            None => settings.include_chain_id.unwrap_or(true),
        };

        let open_browser = match optional_env("WALLETLOGIN_OPEN_BROWSER")? {
            Some(raw) => parse_bool(&raw, "WALLETLOGIN_OPEN_BROWSER")?,
            None => settings.open_browser.unwrap_or(true),
        };

        Ok(Self {
            authorize_path,
            message_format,
            include_chain_id,
            open_browser,
        })
    }

    pub fn options(&self) -> HandshakeOptions {
        HandshakeOptions {
            authorize_path: self.authorize_path.clone(),
            message_format: self.message_format,
            include_chain_id: self.include_chain_id,
        }
    }
}
