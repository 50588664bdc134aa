//! Error types for walletlogin.

use serde::Serialize;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Challenge error: {0}")]
    Challenge(#[from] ChallengeError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Errors raised while reading the challenge out of the login page URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChallengeError {
    /// The link that opened the login page carried no `nonce`. This points at
    /// the server that generated the link, not at the user.
    #[error("login URL is missing the required 'nonce' parameter")]
    MissingNonce,
}

/// Failures reported by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("request rejected by the user")]
    UserRejected,

    #[error("wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("invalid wallet response: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced by a login attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeError {
    #[error("no wallet provider detected; install a browser wallet such as MetaMask")]
    NoProvider,

    #[error("login URL is missing the required 'nonce' parameter")]
    MissingNonce,

    #[error("wallet request was rejected by the user")]
    UserRejected,

    #[error("wallet failed to sign the login message: {0}")]
    SigningFailed(String),

    #[error("wallet stopped responding during login: {0}")]
    ProviderFault(String),

    #[error("failed to open the authorization endpoint: {0}")]
    Navigation(#[from] NavigationError),

    #[error("a login attempt is already in progress")]
    AttemptInFlight,

    #[error("login already completed for this page")]
    AlreadyCompleted,
}

impl From<ChallengeError> for HandshakeError {
    fn from(err: ChallengeError) -> Self {
        match err {
            ChallengeError::MissingNonce => Self::MissingNonce,
        }
    }
}

/// Errors raised while handing the authorization URL to the browser.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("invalid navigation target '{target}': {message}")]
    InvalidTarget { target: String, message: String },

    #[error("failed to launch browser: {0}")]
    Launch(String),
}

/// Terminal failure kinds of a login attempt.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeFailure {
    NoProvider,
    MissingNonce,
    UserRejected,
    SigningFailed,
    ProviderFault,
    NavigationFailed,
}

impl HandshakeFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoProvider => "no_provider",
            Self::MissingNonce => "missing_nonce",
            Self::UserRejected => "user_rejected",
            Self::SigningFailed => "signing_failed",
            Self::ProviderFault => "provider_fault",
            Self::NavigationFailed => "navigation_failed",
        }
    }

    /// Whether the user can re-trigger the login without reloading the page.
    pub fn retryable(self) -> bool {
        matches!(
            self,
            Self::UserRejected
                | Self::SigningFailed
                | Self::ProviderFault
                | Self::NavigationFailed
        )
    }

    /// Human guidance shown next to the disabled or failed sign action.
    pub fn guidance(self) -> &'static str {
        match self {
            Self::NoProvider => "No Web3 wallet detected. Please install MetaMask or another wallet.",
            Self::MissingNonce => {
                "This login link is incomplete. Ask the application for a new link."
            }
            Self::UserRejected => "The request was declined in your wallet. Try again to sign in.",
            Self::SigningFailed => "Your wallet could not sign the message. Try again.",
            Self::ProviderFault => "Your wallet did not answer. Check that it is unlocked and try again.",
            Self::NavigationFailed => "Could not open the authorization page. Try again.",
        }
    }
}

impl std::fmt::Display for HandshakeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HandshakeError {
    /// Failure state the machine lands in for this error, if the error ends
    /// an attempt. Guard errors leave the machine untouched.
    pub fn failure(&self) -> Option<HandshakeFailure> {
        match self {
            Self::NoProvider => Some(HandshakeFailure::NoProvider),
            Self::MissingNonce => Some(HandshakeFailure::MissingNonce),
            Self::UserRejected => Some(HandshakeFailure::UserRejected),
            Self::SigningFailed(_) => Some(HandshakeFailure::SigningFailed),
            Self::ProviderFault(_) => Some(HandshakeFailure::ProviderFault),
            Self::Navigation(_) => Some(HandshakeFailure::NavigationFailed),
            Self::AttemptInFlight | Self::AlreadyCompleted => None,
        }
    }
}

/// Structured failure payload for the UI surface.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailurePayload {
    pub code: HandshakeFailure,
    pub retryable: bool,
    pub message: String,
}

impl FailurePayload {
    pub fn new(code: HandshakeFailure, message: impl Into<String>) -> Self {
        Self {
            code,
            retryable: code.retryable(),
            message: message.into(),
        }
    }

    /// Serialize for transport over string-only status channels.
    pub fn to_status_line(&self) -> String {
        serde_json::json!({
            "code": self.code.as_str(),
            "retryable": self.retryable,
            "message": self.message,
        })
        .to_string()
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
