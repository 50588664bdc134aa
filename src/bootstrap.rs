//! Bootstrap helpers for walletlogin.
//!
//! Env vars can be kept in `~/.walletlogin/.env` (standard dotenvy format)
//! so the wallet bridge URL does not have to be exported in every shell.

use std::path::PathBuf;

/// Base directory for walletlogin files: `~/.walletlogin`.
pub fn walletlogin_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".walletlogin")
}

/// Path to the walletlogin-specific `.env` file: `~/.walletlogin/.env`.
pub fn walletlogin_env_path() -> PathBuf {
    walletlogin_home().join(".env")
}

/// Load `./.env` and then `~/.walletlogin/.env`.
///
/// dotenvy never overwrites existing env vars, so the effective priority is:
///
///   explicit env vars > `./.env` > `~/.walletlogin/.env`
pub fn load_walletlogin_env() {
    let _ = dotenvy::dotenv();

    let path = walletlogin_env_path();
    if path.exists()
        && let Err(e) = dotenvy::from_path(&path)
    {
        tracing::warn!("Failed to load {}: {}", path.display(), e);
    }
}
